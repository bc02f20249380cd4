pub mod auth;
pub mod booking;
pub mod bus_type;
pub mod onboarding;
pub mod organization;
pub mod response;
pub mod route;
pub mod tenant;
pub mod trip;
pub mod user;

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::Serializer;
use validator::Validate;

use crate::{
    db::Entity,
    error::{flatten_validation_errors, ApiError, FieldError},
};

// Re-export all the models that are used in other modules
pub use auth::{AuthResponse, LoginRequest, RegisterRequest};
pub use booking::{Booking, BookingResponse, BookingStatus};
pub use bus_type::{AcType, Amenity, BusType, BusTypeInput, BusTypeResponse, Deck, Decks, SeatingType};
pub use onboarding::{OnboardingRequest, OnboardingStatus, OnboardingStep, StepValidationRequest};
pub use organization::{Address, Organization, OrganizationInput, OrganizationResponse};
pub use response::ApiResponse;
pub use route::{Route, RouteInput, RouteResponse};
pub use tenant::{
    Branding, NotificationSettings, PaymentGateway, PaymentProvider, Permission,
    PublicTenantResponse, Tenant, TenantInput, TenantResponse, TenantRole, TenantUpdate,
};
pub use trip::{Trip, TripResponse, TripStatus};
pub use user::{Claims, User, UserResponse, UserRole};

/// Implements [`Entity`] for a record with an `id: Option<ObjectId>` field.
macro_rules! impl_entity {
    ($ty:ty, $collection:literal, $label:literal $(, unique = [$($field:literal),+])?) => {
        impl $crate::db::Entity for $ty {
            const COLLECTION: &'static str = $collection;
            const LABEL: &'static str = $label;
            $(const UNIQUE_FIELDS: &'static [&'static str] = &[$($field),+];)?

            fn id(&self) -> Option<::mongodb::bson::oid::ObjectId> {
                self.id
            }

            fn set_id(&mut self, id: ::mongodb::bson::oid::ObjectId) {
                self.id = Some(id);
            }
        }
    };
}
pub(crate) use impl_entity;

/// Records that belong to exactly one user.
pub trait Owned: Entity {
    fn owner_id(&self) -> ObjectId;
}

/// Request payloads: derive-level rules from `validator` plus cross-field
/// rules that need the whole payload.
pub trait ValidateRequest: Validate {
    fn rules(&self, _errors: &mut Vec<FieldError>) {}

    fn field_errors(&self) -> Vec<FieldError> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => flatten_validation_errors("", &e),
        };
        self.rules(&mut errors);
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        errors.dedup();
        errors
    }

    fn check(&self) -> Result<(), ApiError> {
        let errors = self.field_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

pub(crate) fn serialize_oid_as_hex<S>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&id.to_hex())
}

pub(crate) fn serialize_opt_oid_as_hex<S>(
    id: &Option<ObjectId>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match id {
        Some(oid) => serializer.serialize_str(&oid.to_hex()),
        None => serializer.serialize_none(),
    }
}

pub(crate) fn rfc3339(at: DateTime) -> String {
    at.try_to_rfc3339_string().unwrap_or_default()
}

/// Trims the value and maps blank strings to `None`.
pub(crate) fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Id of a freshly loaded record; records read from a store always carry one.
pub(crate) fn record_id<E: Entity>(record: &E) -> Result<ObjectId, ApiError> {
    record
        .id()
        .ok_or_else(|| ApiError::Internal(format!("{} record without id", E::LABEL)))
}
