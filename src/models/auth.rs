use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{user::UserResponse, ValidateRequest};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 2, max = 80, message = "Name must be between 2 and 80 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
}

impl ValidateRequest for RegisterRequest {}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl ValidateRequest for LoginRequest {}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_reports_every_bad_field() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email":"nope","password":"short"}"#).unwrap();
        let fields: Vec<_> = req.field_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["email", "name", "password"]);
    }

    #[test]
    fn login_requires_both_fields() {
        let req: LoginRequest = serde_json::from_str(r#"{"email":"a@b.co"}"#).unwrap();
        let errors = req.field_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "password");
    }
}
