use std::collections::BTreeSet;

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{
    clean_optional, impl_entity, rfc3339, serialize_oid_as_hex, Owned, ValidateRequest,
};
use crate::error::FieldError;

const MAX_SEATS_PER_DECK: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcType {
    Ac,
    NonAc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatingType {
    Seater,
    Sleeper,
    SeaterSleeper,
}

impl SeatingType {
    fn allows_seats(&self) -> bool {
        matches!(self, SeatingType::Seater | SeatingType::SeaterSleeper)
    }

    fn allows_berths(&self) -> bool {
        matches!(self, SeatingType::Sleeper | SeatingType::SeaterSleeper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Amenity {
    Wifi,
    ChargingPoint,
    WaterBottle,
    Blanket,
    ReadingLight,
    Tv,
    Toilet,
    Snacks,
    Cctv,
    GpsTracking,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    #[serde(default)]
    #[validate(range(max = 80, message = "A deck holds at most 80 seats"))]
    pub seater_count: u32,
    #[serde(default)]
    #[validate(range(max = 80, message = "A deck holds at most 80 berths"))]
    pub sleeper_count: u32,
    #[serde(default)]
    pub seater_price: Option<f64>,
    #[serde(default)]
    pub sleeper_price: Option<f64>,
}

impl Deck {
    pub fn capacity(&self) -> u32 {
        self.seater_count.saturating_add(self.sleeper_count)
    }

    fn check(&self, path: &str, seating: SeatingType, errors: &mut Vec<FieldError>) {
        if self.seater_count > 0 && !seating.allows_seats() {
            errors.push(FieldError::new(
                format!("{path}.seaterCount"),
                "Sleeper buses cannot have seats",
            ));
        }
        if self.sleeper_count > 0 && !seating.allows_berths() {
            errors.push(FieldError::new(
                format!("{path}.sleeperCount"),
                "Seater buses cannot have sleeper berths",
            ));
        }
        if self.seater_count > 0 && !is_positive(self.seater_price) {
            errors.push(FieldError::new(
                format!("{path}.seaterPrice"),
                "Seater price must be greater than zero",
            ));
        }
        if self.sleeper_count > 0 && !is_positive(self.sleeper_price) {
            errors.push(FieldError::new(
                format!("{path}.sleeperPrice"),
                "Sleeper price must be greater than zero",
            ));
        }
        if self.capacity() > MAX_SEATS_PER_DECK {
            errors.push(FieldError::new(
                path.to_string(),
                "A deck holds at most 80 seats and berths",
            ));
        }
    }
}

fn is_positive(price: Option<f64>) -> bool {
    price.is_some_and(|p| p.is_finite() && p > 0.0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Decks {
    #[serde(default)]
    #[validate(nested)]
    pub lower: Deck,
    #[serde(default)]
    #[validate(nested)]
    pub upper: Option<Deck>,
}

impl Decks {
    pub fn total_capacity(&self) -> u32 {
        self.lower
            .capacity()
            .saturating_add(self.upper.as_ref().map(Deck::capacity).unwrap_or(0))
    }

    /// Cheapest seat or berth on offer, if any is priced.
    pub fn lowest_fare(&self) -> Option<f64> {
        std::iter::once(&self.lower)
            .chain(self.upper.as_ref())
            .flat_map(|deck| {
                let seat = deck.seater_price.filter(|_| deck.seater_count > 0);
                let berth = deck.sleeper_price.filter(|_| deck.sleeper_count > 0);
                seat.into_iter().chain(berth)
            })
            .filter(|price| *price > 0.0)
            .min_by(|a, b| a.total_cmp(b))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusType {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId,
    pub organization_id: ObjectId,
    pub name: String,
    pub description: Option<String>,
    pub ac_type: AcType,
    pub seating_type: SeatingType,
    pub decks: Decks,
    pub amenities: BTreeSet<Amenity>,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(BusType, "bus_types", "Bus type");

impl Owned for BusType {
    fn owner_id(&self) -> ObjectId {
        self.owner_id
    }
}

impl BusType {
    /// Builds a record from an input that already passed [`ValidateRequest::check`].
    pub fn new(owner_id: ObjectId, organization_id: ObjectId, input: &BusTypeInput) -> Self {
        let now = DateTime::now();
        let mut bus_type = Self {
            id: None,
            owner_id,
            organization_id,
            name: String::new(),
            description: None,
            ac_type: AcType::NonAc,
            seating_type: SeatingType::Seater,
            decks: Decks::default(),
            amenities: BTreeSet::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        bus_type.apply(input);
        bus_type
    }

    pub fn apply(&mut self, input: &BusTypeInput) {
        self.name = input.name.trim().to_string();
        self.description = clean_optional(&input.description);
        if let Some(ac_type) = input.ac_type {
            self.ac_type = ac_type;
        }
        if let Some(seating_type) = input.seating_type {
            self.seating_type = seating_type;
        }
        if let Some(decks) = &input.decks {
            self.decks = decks.clone();
        }
        self.amenities = input.amenities.clone();
        if let Some(is_active) = input.is_active {
            self.is_active = is_active;
        }
        self.updated_at = DateTime::now();
    }
}

/// Payload for creating or replacing a bus type. The onboarding wizard sends
/// the same shape without `organizationId`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BusTypeInput {
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    #[validate(length(min = 2, max = 80, message = "Bus type name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    pub ac_type: Option<AcType>,
    #[serde(default)]
    pub seating_type: Option<SeatingType>,
    #[serde(default)]
    #[validate(nested)]
    pub decks: Option<Decks>,
    #[serde(default)]
    pub amenities: BTreeSet<Amenity>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl ValidateRequest for BusTypeInput {
    fn rules(&self, errors: &mut Vec<FieldError>) {
        if self.ac_type.is_none() {
            errors.push(FieldError::new("acType", "AC type is required"));
        }
        let Some(seating) = self.seating_type else {
            errors.push(FieldError::new("seatingType", "Seating type is required"));
            return;
        };
        let Some(decks) = &self.decks else {
            errors.push(FieldError::new("decks", "Deck layout is required"));
            return;
        };

        decks.lower.check("decks.lower", seating, errors);
        if let Some(upper) = &decks.upper {
            upper.check("decks.upper", seating, errors);
        }
        if decks.total_capacity() == 0 {
            errors.push(FieldError::new(
                "decks",
                "A bus needs at least one seat or berth",
            ));
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusTypeResponse {
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub owner_id: ObjectId,
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub organization_id: ObjectId,
    pub name: String,
    pub description: Option<String>,
    pub ac_type: AcType,
    pub seating_type: SeatingType,
    pub decks: Decks,
    pub total_capacity: u32,
    pub amenities: BTreeSet<Amenity>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl BusTypeResponse {
    pub fn new(bus_type: BusType, id: ObjectId) -> Self {
        Self {
            id,
            owner_id: bus_type.owner_id,
            organization_id: bus_type.organization_id,
            total_capacity: bus_type.decks.total_capacity(),
            name: bus_type.name,
            description: bus_type.description,
            ac_type: bus_type.ac_type,
            seating_type: bus_type.seating_type,
            decks: bus_type.decks,
            amenities: bus_type.amenities,
            is_active: bus_type.is_active,
            created_at: rfc3339(bus_type.created_at),
            updated_at: rfc3339(bus_type.updated_at),
        }
    }
}
