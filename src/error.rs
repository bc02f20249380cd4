use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    http::StatusCode,
    HttpRequest, HttpResponse, ResponseError,
};
use log::error;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::db::StoreError;

/// A single field-level validation failure, reported under `error.details`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidId(_) => "INVALID_ID",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{what} not found"))
    }

    pub fn forbidden(what: &str) -> Self {
        ApiError::Forbidden(format!("You do not have access to this {what}"))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::InvalidId(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(cause) = self {
            error!("Request failed: {}", cause);
        }

        let mut body = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let ApiError::Validation(details) = self {
            body["details"] = json!(details);
        }

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": body,
        }))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidId(id) => ApiError::InvalidId(id),
            StoreError::Duplicate(what) => ApiError::Conflict(format!("{what} already exists")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(flatten_validation_errors("", &errors))
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Internal(format!("bcrypt: {err}"))
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        ApiError::Internal(format!("blocking task: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ApiError::Internal(format!("jwt: {err}"))
    }
}

/// Turns nested `validator` output into dotted field paths, e.g.
/// `busTypes[0].decks.lower.seaterPrice`. Sorted so responses are stable.
pub fn flatten_validation_errors(prefix: &str, errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_errors(prefix, errors, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let field = camel_case(field);
        let path = if prefix.is_empty() {
            field
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for e in field_errors {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{path} is invalid"));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_errors(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

/// `seater_price` -> `seaterPrice`, matching the JSON field names clients send.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(format!("Invalid request body: {err}")).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(format!("Invalid query string: {err}")).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(format!("Invalid path: {err}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn validation_error_renders_details() {
        let err = ApiError::Validation(vec![FieldError::new("name", "Name is required")]);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(value["error"]["details"][0]["field"], "name");
    }

    #[actix_web::test]
    async fn internal_error_hides_cause() {
        let err = ApiError::Internal("connection refused".to_string());
        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["message"], "Internal server error");
    }

    #[test]
    fn field_paths_use_json_names() {
        assert_eq!(camel_case("seater_price"), "seaterPrice");
        assert_eq!(camel_case("name"), "name");
        assert_eq!(camel_case("__all__"), "All");
    }

    #[test]
    fn store_errors_map_to_http_errors() {
        let err: ApiError = StoreError::Duplicate("Tenant slug".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err: ApiError = StoreError::InvalidId("nope".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_ID");
    }

    #[test]
    fn lost_blocking_pool_is_an_internal_error() {
        let err: ApiError = actix_web::error::BlockingError.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
