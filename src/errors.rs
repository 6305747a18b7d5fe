use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Standard JSON error body returned by the HTTP surface.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Bad Request").
    pub error: String,
    /// Human-readable error description.
    pub message: String,
    /// ISO 8601 timestamp when the error occurred.
    pub timestamp: String,
}

/// Service-level error taxonomy.
///
/// The propagation-engine variants (`InvalidConversion`, `MissingAnchor`,
/// `IdentityConflict`) are reported per affected unit or group and never
/// abort a whole cascade; only the caller decides what to do with them.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// A unit carries a conversion value that cannot scale anything.
    #[error("Invalid conversion value {value} on unit {unit_id}")]
    InvalidConversion { unit_id: i64, value: Decimal },

    /// A group has no member with a positive conversion value.
    #[error("Group {0} has no electable anchor")]
    MissingAnchor(String),

    /// An edit could not be matched to any snapshot entry by id, code, or
    /// original code.
    #[error("Identity conflict: {0}")]
    IdentityConflict(String),

    /// Surfaced verbatim from an external collaborator; retry policy belongs
    /// to the caller.
    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationError(_)
            | ServiceError::InvalidConversion { .. }
            | ServiceError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            ServiceError::MissingAnchor(_) | ServiceError::IdentityConflict(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            ServiceError::SerializationError(_)
            | ServiceError::EventError(_)
            | ServiceError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}
