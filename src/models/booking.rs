use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::{impl_entity, rfc3339, serialize_oid_as_hex, tenant::PaymentProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub name: String,
    pub age: u8,
    pub gender: String,
    pub seat_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    pub reference: Option<String>,
}

/// A passenger booking. Bookings are read back for their owner; seat
/// allocation and payment capture are not part of this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tenant_id: ObjectId,
    pub user_id: ObjectId,
    pub trip_id: ObjectId,
    pub passengers: Vec<Passenger>,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment: PaymentInfo,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(Booking, "bookings", "Booking");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub id: ObjectId,
    /// Short uppercase reference shown to passengers.
    pub booking_ref: String,
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub trip_id: ObjectId,
    pub passengers: Vec<Passenger>,
    pub seats: Vec<String>,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment: PaymentInfo,
    pub booked_at: String,
}

impl BookingResponse {
    pub fn new(booking: Booking, id: ObjectId) -> Self {
        let hex = id.to_hex().to_uppercase();
        Self {
            id,
            booking_ref: hex[hex.len() - 8..].to_string(),
            trip_id: booking.trip_id,
            seats: booking
                .passengers
                .iter()
                .map(|p| p.seat_number.clone())
                .collect(),
            passengers: booking.passengers,
            total_amount: booking.total_amount,
            status: booking.status,
            payment: booking.payment,
            booked_at: rfc3339(booking.created_at),
        }
    }
}
