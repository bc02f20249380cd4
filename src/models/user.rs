use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::{impl_entity, rfc3339, serialize_oid_as_hex, serialize_opt_oid_as_hex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Platform staff; may act on any tenant's records.
    Admin,
    /// Bus operator using the admin console.
    Operator,
    /// Storefront passenger account.
    Customer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Operator => "operator",
            UserRole::Customer => "customer",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn can_use_console(&self) -> bool {
        !matches!(self, UserRole::Customer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    pub role: UserRole,
    #[serde(default)]
    pub tenant_id: Option<ObjectId>,
    #[serde(default)]
    pub onboarding_completed: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl_entity!(User, "users", "User", unique = ["email"]);

impl User {
    pub fn new(name: &str, email: &str, password_hash: String, role: UserRole) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            name: name.trim().to_string(),
            email: normalize_email(email),
            password: password_hash,
            role,
            tenant_id: None,
            onboarding_completed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// JWT payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: UserRole,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(serialize_with = "serialize_oid_as_hex")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(serialize_with = "serialize_opt_oid_as_hex")]
    pub tenant_id: Option<ObjectId>,
    pub onboarding_completed: bool,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User, id: ObjectId) -> Self {
        Self {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
            onboarding_completed: user.onboarding_completed,
            created_at: rfc3339(user.created_at),
        }
    }
}
