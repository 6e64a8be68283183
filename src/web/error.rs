use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::checkin_service::CheckinError;

/// Non-standard status used for store failures, so clients can tell them apart
/// from transport errors.
pub const DATABASE_ERROR_STATUS: u16 = 725;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Request body is too large: {0}")]
    PayloadTooLarge(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not acceptable: {0}")]
    NotAcceptable(String),
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title, description) = match self {
            AppError::DatabaseError(msg) => (
                StatusCode::from_u16(DATABASE_ERROR_STATUS)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                "Database Error",
                format!(
                    "Sorry, could not write or read your thing to or from the database: {msg}."
                ),
            ),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Request body is too large", msg)
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "Invalid JSON", msg),
            AppError::NotAcceptable(msg) => (StatusCode::NOT_ACCEPTABLE, "Not Acceptable", msg),
            AppError::UnsupportedMediaType(msg) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "Unsupported Media Type", msg)
            }
        };
        (
            status,
            Json(serde_json::json!({ "title": title, "description": description })),
        )
            .into_response()
    }
}

impl From<CheckinError> for AppError {
    fn from(err: CheckinError) -> Self {
        match err {
            CheckinError::NotFound(e) => AppError::DatabaseError(e.to_string()),
            e @ CheckinError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("Could not decode the request body: {err}"))
    }
}
