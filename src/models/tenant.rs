use std::{borrow::Cow, collections::HashSet};

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{clean_optional, impl_entity, rfc3339, serialize_oid_as_hex, ValidateRequest};
use crate::error::FieldError;

pub const DEFAULT_PRIMARY_COLOR: &str = "#1e40af";
pub const DEFAULT_SECONDARY_COLOR: &str = "#f59e0b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageOrganizations,
    ManageFleet,
    ManageRoutes,
    ManageTrips,
    ViewBookings,
    ManageBookings,
    ManageTenant,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::ManageOrganizations,
        Permission::ManageFleet,
        Permission::ManageRoutes,
        Permission::ManageTrips,
        Permission::ViewBookings,
        Permission::ManageBookings,
        Permission::ManageTenant,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TenantRole {
    #[serde(default)]
    #[validate(length(min = 2, max = 40, message = "Role name is required"))]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Roles every new tenant starts with.
pub fn default_roles() -> Vec<TenantRole> {
    vec![
        TenantRole {
            name: "owner".to_string(),
            permissions: Permission::ALL.to_vec(),
        },
        TenantRole {
            name: "manager".to_string(),
            permissions: vec![
                Permission::ManageFleet,
                Permission::ManageRoutes,
                Permission::ManageTrips,
                Permission::ViewBookings,
                Permission::ManageBookings,
            ],
        },
        TenantRole {
            name: "agent".to_string(),
            permissions: vec![Permission::ViewBookings, Permission::ManageBookings],
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    #[serde(default)]
    #[validate(url(message = "Logo URL must be a valid URL"))]
    pub logo_url: Option<String>,
    #[serde(default = "default_primary_color")]
    #[validate(custom(function = "validate_hex_color"))]
    pub primary_color: String,
    #[serde(default = "default_secondary_color")]
    #[validate(custom(function = "validate_hex_color"))]
    pub secondary_color: String,
    #[serde(default)]
    #[validate(length(max = 160, message = "Tagline is too long"))]
    pub tagline: Option<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            logo_url: None,
            primary_color: default_primary_color(),
            secondary_color: default_secondary_color(),
            tagline: None,
        }
    }
}

fn default_primary_color() -> String {
    DEFAULT_PRIMARY_COLOR.to_string()
}

fn default_secondary_color() -> String {
    DEFAULT_SECONDARY_COLOR.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    #[default]
    None,
    Stripe,
    Razorpay,
    Paystack,
}

/// Payment gateway credentials. Stored only; no payment is ever processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentGateway {
    #[serde(default)]
    pub provider: PaymentProvider,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub key_id: Option<String>,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub key_secret: Option<String>,
    #[serde(default)]
    pub is_live: bool,
}

impl PaymentGateway {
    fn check(&self, path: &str, errors: &mut Vec<FieldError>) {
        if self.provider == PaymentProvider::None {
            return;
        }
        if clean_optional(&self.key_id).is_none() {
            errors.push(FieldError::new(
                format!("{path}.keyId"),
                "Key id is required for the selected provider",
            ));
        }
        if clean_optional(&self.key_secret).is_none() {
            errors.push(FieldError::new(
                format!("{path}.keySecret"),
                "Key secret is required for the selected provider",
            ));
        }
    }
}

/// Notification preferences. Stored only; nothing is ever sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default = "enabled")]
    pub email_enabled: bool,
    #[serde(default)]
    pub sms_enabled: bool,
    #[serde(default)]
    pub whatsapp_enabled: bool,
    #[serde(default)]
    #[validate(email(message = "Sender email must be a valid email address"))]
    pub sender_email: Option<String>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email_enabled: true,
            sms_enabled: false,
            whatsapp_enabled: false,
            sender_email: None,
        }
    }
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId,
    pub name: String,
    pub slug: String,
    pub branding: Branding,
    pub payment_gateway: PaymentGateway,
    pub notification_settings: NotificationSettings,
    pub roles: Vec<TenantRole>,
    pub is_active: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

// One tenant per operator account.
impl_entity!(Tenant, "tenants", "Tenant", unique = ["slug", "ownerId"]);

impl Tenant {
    pub fn new(owner_id: ObjectId, input: &TenantInput) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            owner_id,
            name: input.name.trim().to_string(),
            slug: input.slug.trim().to_string(),
            branding: input.branding.clone().unwrap_or_default(),
            payment_gateway: input.payment_gateway.clone().unwrap_or_default(),
            notification_settings: input.notification_settings.clone().unwrap_or_default(),
            roles: input.roles.clone().unwrap_or_else(default_roles),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a partial update. A gateway update without a secret keeps the
    /// stored one, so clients can round-trip the masked response.
    pub fn apply(&mut self, update: &TenantUpdate) {
        if let Some(name) = &update.name {
            self.name = name.trim().to_string();
        }
        if let Some(branding) = &update.branding {
            self.branding = branding.clone();
        }
        if let Some(gateway) = &update.payment_gateway {
            let mut gateway = gateway.clone();
            if clean_optional(&gateway.key_secret).is_none()
                && gateway.provider == self.payment_gateway.provider
            {
                gateway.key_secret = self.payment_gateway.key_secret.clone();
            }
            self.payment_gateway = gateway;
        }
        if let Some(settings) = &update.notification_settings {
            self.notification_settings = settings.clone();
        }
        if let Some(roles) = &update.roles {
            self.roles = roles.clone();
        }
        self.updated_at = DateTime::now();
    }

    /// Gateway errors of the record as stored, so a partial update cannot
    /// leave a provider without credentials.
    pub fn gateway_errors(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        self.payment_gateway.check("paymentGateway", &mut errors);
        errors
    }

    pub fn is_owned_by(&self, user_id: ObjectId) -> bool {
        self.owner_id == user_id
    }
}

/// Lowercase letters, digits and single hyphens, 3 to 50 characters.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let valid = (3..=50).contains(&slug.len())
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug");
        err.message = Some(Cow::from(
            "Slug must be 3-50 lowercase letters, digits or hyphens",
        ));
        Err(err)
    }
}

/// `#rgb` or `#rrggbb`.
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    let valid = color
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()));

    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("color");
        err.message = Some(Cow::from("Colors must be hex values like #1e40af"));
        Err(err)
    }
}

fn check_roles(path: &str, roles: &[TenantRole], errors: &mut Vec<FieldError>) {
    let mut seen = HashSet::new();
    for (index, role) in roles.iter().enumerate() {
        if !seen.insert(role.name.trim().to_lowercase()) {
            errors.push(FieldError::new(
                format!("{path}[{index}].name"),
                "Role names must be unique",
            ));
        }
    }
}

/// Tenant details collected by the onboarding wizard.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TenantInput {
    #[serde(default)]
    #[validate(length(min = 2, max = 120, message = "Tenant name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,
    #[serde(default)]
    #[validate(nested)]
    pub branding: Option<Branding>,
    #[serde(default)]
    #[validate(nested)]
    pub payment_gateway: Option<PaymentGateway>,
    #[serde(default)]
    #[validate(nested)]
    pub notification_settings: Option<NotificationSettings>,
    #[serde(default)]
    #[validate(nested)]
    pub roles: Option<Vec<TenantRole>>,
}

impl ValidateRequest for TenantInput {
    fn rules(&self, errors: &mut Vec<FieldError>) {
        if let Some(gateway) = &self.payment_gateway {
            gateway.check("paymentGateway", errors);
        }
        if let Some(roles) = &self.roles {
            check_roles("roles", roles, errors);
        }
    }
}

/// Body of `PUT /api/tenant`; absent sections are left unchanged.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TenantUpdate {
    #[serde(default)]
    #[validate(length(min = 2, max = 120, message = "Tenant name is required"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub branding: Option<Branding>,
    #[serde(default)]
    #[validate(nested)]
    pub payment_gateway: Option<PaymentGateway>,
    #[serde(default)]
    #[validate(nested)]
    pub notification_settings: Option<NotificationSettings>,
    #[serde(default)]
    #[validate(nested)]
    pub roles: Option<Vec<TenantRole>>,
}

impl ValidateRequest for TenantUpdate {
    fn rules(&self, errors: &mut Vec<FieldError>) {
        if let Some(roles) = &self.roles {
            if roles.is_empty() {
                errors.push(FieldError::new("roles", "At least one role is required"));
            }
            check_roles("roles", roles, errors);
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentGatewayResponse {
    pub provider: PaymentProvider,
    pub key_id: Option<String>,
    pub has_key_secret: bool,
    pub is_live: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantResponse {
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub id: ObjectId,
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub owner_id: ObjectId,
    pub name: String,
    pub slug: String,
    pub branding: Branding,
    pub payment_gateway: PaymentGatewayResponse,
    pub notification_settings: NotificationSettings,
    pub roles: Vec<TenantRole>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TenantResponse {
    pub fn new(tenant: Tenant, id: ObjectId) -> Self {
        let gateway = tenant.payment_gateway;
        Self {
            id,
            owner_id: tenant.owner_id,
            name: tenant.name,
            slug: tenant.slug,
            branding: tenant.branding,
            payment_gateway: PaymentGatewayResponse {
                provider: gateway.provider,
                key_id: gateway.key_id,
                has_key_secret: clean_optional(&gateway.key_secret).is_some(),
                is_live: gateway.is_live,
            },
            notification_settings: tenant.notification_settings,
            roles: tenant.roles,
            is_active: tenant.is_active,
            created_at: rfc3339(tenant.created_at),
            updated_at: rfc3339(tenant.updated_at),
        }
    }
}

/// What the storefront may see about a tenant.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTenantResponse {
    pub name: String,
    pub slug: String,
    pub branding: Branding,
}

impl From<Tenant> for PublicTenantResponse {
    fn from(tenant: Tenant) -> Self {
        Self {
            name: tenant.name,
            slug: tenant.slug,
            branding: tenant.branding,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn slugs() {
        assert!(validate_slug("easy-coach").is_ok());
        assert!(validate_slug("mash2024").is_ok());
        assert!(validate_slug("ab").is_err());
        assert!(validate_slug("Easy-Coach").is_err());
        assert!(validate_slug("-easy").is_err());
        assert!(validate_slug("easy--coach").is_err());
    }

    #[test]
    fn hex_colors() {
        assert!(validate_hex_color("#fff").is_ok());
        assert!(validate_hex_color("#1E40AF").is_ok());
        assert!(validate_hex_color("1e40af").is_err());
        assert!(validate_hex_color("#12345").is_err());
        assert!(validate_hex_color("#gggggg").is_err());
    }

    #[test]
    fn live_gateway_needs_credentials() {
        let input: TenantInput = serde_json::from_value(json!({
            "name": "Easy Coach",
            "slug": "easy-coach",
            "paymentGateway": { "provider": "paystack", "keyId": "pk_live_123" }
        }))
        .unwrap();
        let fields: Vec<_> = input.field_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["paymentGateway.keySecret"]);
    }

    #[test]
    fn new_tenant_gets_defaults() {
        let input: TenantInput =
            serde_json::from_value(json!({ "name": "Easy Coach", "slug": "easy-coach" })).unwrap();
        let tenant = Tenant::new(ObjectId::new(), &input);
        assert_eq!(tenant.branding.primary_color, DEFAULT_PRIMARY_COLOR);
        assert_eq!(tenant.payment_gateway.provider, PaymentProvider::None);
        assert!(tenant.notification_settings.email_enabled);
        assert_eq!(tenant.roles.len(), 3);
    }

    #[test]
    fn update_keeps_secret_when_omitted() {
        let input: TenantInput = serde_json::from_value(json!({
            "name": "Easy Coach",
            "slug": "easy-coach",
            "paymentGateway": { "provider": "stripe", "keyId": "pk", "keySecret": "sk" }
        }))
        .unwrap();
        let mut tenant = Tenant::new(ObjectId::new(), &input);

        let update: TenantUpdate = serde_json::from_value(json!({
            "paymentGateway": { "provider": "stripe", "keyId": "pk2", "isLive": true }
        }))
        .unwrap();
        tenant.apply(&update);

        assert_eq!(tenant.payment_gateway.key_id.as_deref(), Some("pk2"));
        assert_eq!(tenant.payment_gateway.key_secret.as_deref(), Some("sk"));
        assert!(tenant.payment_gateway.is_live);

        assert!(tenant.gateway_errors().is_empty());

        let response = TenantResponse::new(tenant, ObjectId::new());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["paymentGateway"]["hasKeySecret"], true);
        assert!(value["paymentGateway"].get("keySecret").is_none());
    }

    #[test]
    fn switching_provider_drops_the_old_secret() {
        let input: TenantInput = serde_json::from_value(json!({
            "name": "Easy Coach",
            "slug": "easy-coach",
            "paymentGateway": { "provider": "razorpay", "keyId": "rzp", "keySecret": "sk" }
        }))
        .unwrap();
        let mut tenant = Tenant::new(ObjectId::new(), &input);

        let update: TenantUpdate = serde_json::from_value(json!({
            "paymentGateway": { "provider": "stripe", "isLive": true }
        }))
        .unwrap();
        assert!(update.field_errors().is_empty());
        tenant.apply(&update);

        let fields: Vec<_> = tenant.gateway_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["paymentGateway.keyId", "paymentGateway.keySecret"]);
    }
}
