use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::{impl_entity, rfc3339, serialize_oid_as_hex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Scheduled,
    Boarding,
    Departed,
    Completed,
    Cancelled,
}

/// A scheduled run of a bus type over a route. Trips are listed but never
/// created or scheduled by this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub tenant_id: ObjectId,
    pub route_id: ObjectId,
    pub bus_type_id: ObjectId,
    pub departure_at: DateTime,
    pub arrival_at: DateTime,
    pub fare: f64,
    pub status: TripStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(Trip, "trips", "Trip");

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub route_id: ObjectId,
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub bus_type_id: ObjectId,
    pub departure_at: String,
    pub arrival_at: String,
    pub fare: f64,
    pub status: TripStatus,
}

impl TripResponse {
    pub fn new(trip: Trip, id: ObjectId) -> Self {
        Self {
            id,
            route_id: trip.route_id,
            bus_type_id: trip.bus_type_id,
            departure_at: rfc3339(trip.departure_at),
            arrival_at: rfc3339(trip.arrival_at),
            fare: trip.fare,
            status: trip.status,
        }
    }
}
