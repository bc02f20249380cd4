use std::borrow::Cow;

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{
    clean_optional, impl_entity, rfc3339, serialize_oid_as_hex, serialize_opt_oid_as_hex, Owned,
    ValidateRequest,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Address line is required"))]
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "Postal code is too long"))]
    pub postal_code: Option<String>,
    #[serde(default)]
    #[validate(length(min = 2, max = 100, message = "Country is required"))]
    pub country: String,
}

impl Address {
    fn cleaned(&self) -> Self {
        Self {
            line1: self.line1.trim().to_string(),
            line2: clean_optional(&self.line2),
            city: self.city.trim().to_string(),
            state: clean_optional(&self.state),
            postal_code: clean_optional(&self.postal_code),
            country: self.country.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId,
    #[serde(default)]
    pub tenant_id: Option<ObjectId>,
    pub name: String,
    pub legal_name: Option<String>,
    pub registration_number: Option<String>,
    pub tax_id: Option<String>,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub website: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(Organization, "organizations", "Organization");

impl Owned for Organization {
    fn owner_id(&self) -> ObjectId {
        self.owner_id
    }
}

impl Organization {
    pub fn new(owner_id: ObjectId, tenant_id: Option<ObjectId>, input: &OrganizationInput) -> Self {
        let now = DateTime::now();
        let mut organization = Self {
            id: None,
            owner_id,
            tenant_id,
            name: String::new(),
            legal_name: None,
            registration_number: None,
            tax_id: None,
            email: String::new(),
            phone: String::new(),
            address: input.address.clone(),
            website: None,
            is_primary: false,
            created_at: now,
            updated_at: now,
        };
        organization.apply(input);
        organization
    }

    /// Copies the editable fields from the input. `is_primary` is handled by
    /// the caller because it affects the owner's other organizations.
    pub fn apply(&mut self, input: &OrganizationInput) {
        self.name = input.name.trim().to_string();
        self.legal_name = clean_optional(&input.legal_name);
        self.registration_number = clean_optional(&input.registration_number);
        self.tax_id = clean_optional(&input.tax_id);
        self.email = input.email.trim().to_lowercase();
        self.phone = input.phone.trim().to_string();
        self.address = input.address.cleaned();
        self.website = clean_optional(&input.website);
        self.updated_at = DateTime::now();
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInput {
    #[serde(default)]
    #[validate(length(min = 2, max = 120, message = "Organization name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub legal_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub registration_number: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub tax_id: Option<String>,
    #[serde(default)]
    #[validate(email(message = "A valid contact email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
    #[serde(default = "empty_address")]
    #[validate(nested)]
    pub address: Address,
    #[serde(default)]
    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,
    #[serde(default)]
    pub is_primary: Option<bool>,
}

impl ValidateRequest for OrganizationInput {}

fn empty_address() -> Address {
    Address {
        line1: String::new(),
        line2: None,
        city: String::new(),
        state: None,
        postal_code: None,
        country: String::new(),
    }
}

/// Digits with optional leading `+` and spaces, dashes or parentheses as
/// separators; 7 to 15 digits.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);
    let allowed = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
    let digits = body.chars().filter(char::is_ascii_digit).count();

    if allowed && (7..=15).contains(&digits) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some(Cow::from("A valid phone number is required"));
        Err(err)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub owner_id: ObjectId,
    #[serde(serialize_with = "serialize_opt_oid_as_hex")]
    pub tenant_id: Option<ObjectId>,
    pub name: String,
    pub legal_name: Option<String>,
    pub registration_number: Option<String>,
    pub tax_id: Option<String>,
    pub email: String,
    pub phone: String,
    pub address: Address,
    pub website: Option<String>,
    pub is_primary: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl OrganizationResponse {
    pub fn new(org: Organization, id: ObjectId) -> Self {
        Self {
            id,
            owner_id: org.owner_id,
            tenant_id: org.tenant_id,
            name: org.name,
            legal_name: org.legal_name,
            registration_number: org.registration_number,
            tax_id: org.tax_id,
            email: org.email,
            phone: org.phone,
            address: org.address,
            website: org.website,
            is_primary: org.is_primary,
            created_at: rfc3339(org.created_at),
            updated_at: rfc3339(org.updated_at),
        }
    }
}
