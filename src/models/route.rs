use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{impl_entity, rfc3339, serialize_oid_as_hex, Owned, ValidateRequest};
use crate::error::FieldError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId,
    pub organization_id: ObjectId,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub duration_minutes: u32,
    #[serde(default)]
    pub stops: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(Route, "routes", "Route");

impl Owned for Route {
    fn owner_id(&self) -> ObjectId {
        self.owner_id
    }
}

impl Route {
    pub fn new(owner_id: ObjectId, organization_id: ObjectId, input: &RouteInput) -> Self {
        let now = DateTime::now();
        let mut route = Self {
            id: None,
            owner_id,
            organization_id,
            origin: String::new(),
            destination: String::new(),
            distance_km: 0.0,
            duration_minutes: 0,
            stops: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        route.apply(input);
        route
    }

    pub fn apply(&mut self, input: &RouteInput) {
        self.origin = input.origin.trim().to_string();
        self.destination = input.destination.trim().to_string();
        if let Some(distance_km) = input.distance_km {
            self.distance_km = distance_km;
        }
        if let Some(duration_minutes) = input.duration_minutes {
            self.duration_minutes = duration_minutes;
        }
        self.stops = input.stops.iter().map(|s| s.trim().to_string()).collect();
        if let Some(is_active) = input.is_active {
            self.is_active = is_active;
        }
        self.updated_at = DateTime::now();
    }

    /// Origin, intermediate stops and destination in travel order.
    pub fn waypoints(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.origin.as_str())
            .chain(self.stops.iter().map(String::as_str))
            .chain(std::iter::once(self.destination.as_str()))
    }

    /// Whether a passenger can board at `from` and alight at `to`. Either
    /// end may be omitted; matching ignores case and surrounding spaces.
    pub fn serves(&self, from: Option<&str>, to: Option<&str>) -> bool {
        let stops: Vec<String> = self.waypoints().map(place_key).collect();
        let last = stops.len() - 1;
        let board = match from.map(place_key) {
            Some(from) => match stops[..last].iter().position(|s| *s == from) {
                Some(index) => index,
                None => return false,
            },
            None => 0,
        };

        match to.map(place_key) {
            Some(to) => stops[board + 1..].iter().any(|s| *s == to),
            None => true,
        }
    }
}

fn place_key(place: &str) -> String {
    place.trim().to_lowercase()
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RouteInput {
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    #[validate(length(min = 2, max = 80, message = "Origin is required"))]
    pub origin: String,
    #[serde(default)]
    #[validate(length(min = 2, max = 80, message = "Destination is required"))]
    pub destination: String,
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0, max = 5000.0, message = "Distance must be between 0 and 5000 km"))]
    pub distance_km: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 1, max = 4320, message = "Duration must be between 1 minute and 72 hours"))]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    #[validate(length(max = 30, message = "A route has at most 30 stops"))]
    pub stops: Vec<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl RouteInput {
    /// Case-insensitive `(origin, destination)` pair used to spot duplicates.
    pub fn pair_key(&self) -> (String, String) {
        (place_key(&self.origin), place_key(&self.destination))
    }
}

impl ValidateRequest for RouteInput {
    fn rules(&self, errors: &mut Vec<FieldError>) {
        if self.distance_km.is_none() {
            errors.push(FieldError::new("distanceKm", "Distance is required"));
        }
        if self.duration_minutes.is_none() {
            errors.push(FieldError::new("durationMinutes", "Duration is required"));
        }

        let (origin, destination) = self.pair_key();
        if !origin.is_empty() && origin == destination {
            errors.push(FieldError::new(
                "destination",
                "Destination must differ from origin",
            ));
        }
        for (index, stop) in self.stops.iter().enumerate() {
            let stop = place_key(stop);
            if stop.is_empty() {
                errors.push(FieldError::new(format!("stops[{index}]"), "Stop name is required"));
            } else if stop == origin || stop == destination {
                errors.push(FieldError::new(
                    format!("stops[{index}]"),
                    "Stops cannot repeat the origin or destination",
                ));
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub owner_id: ObjectId,
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub organization_id: ObjectId,
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub stops: Vec<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl RouteResponse {
    pub fn new(route: Route, id: ObjectId) -> Self {
        Self {
            id,
            owner_id: route.owner_id,
            organization_id: route.organization_id,
            origin: route.origin,
            destination: route.destination,
            distance_km: route.distance_km,
            duration_minutes: route.duration_minutes,
            stops: route.stops,
            is_active: route.is_active,
            created_at: rfc3339(route.created_at),
            updated_at: rfc3339(route.updated_at),
        }
    }
}
