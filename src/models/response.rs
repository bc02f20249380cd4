use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn respond(self, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status).json(self)
    }

    pub fn ok(self) -> HttpResponse {
        self.respond(StatusCode::OK)
    }

    pub fn created(self) -> HttpResponse {
        self.respond(StatusCode::CREATED)
    }
}
