//! Error taxonomy shared by every marketplace service.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use tracing::{debug, error};
use validator::ValidationErrors;

use crate::db::DatabaseError;
use crate::models::ApiResponse;

/// Errors returned by service operations.
///
/// Handlers turn these into the JSON error envelope with
/// [`ServiceError::code`] and [`ServiceError::status`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No valid session, or the session's user no longer exists.
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated, but the role, suspension flag or ownership forbids it.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Input rejected before any write happened.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// The operation clashes with current state (overlap, duplicate, race).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The payment gateway declined or failed.
    #[error("Payment gateway error: {0}")]
    ExternalFailure(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable error code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized => "UNAUTHORIZED",
            ServiceError::Forbidden(_) => "FORBIDDEN",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::ValidationFailed(_) => "VALIDATION_FAILED",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::ExternalFailure(_) => "PAYMENT_FAILED",
            ServiceError::Database(_) | ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::ExternalFailure(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to clients. Infrastructure details stay in logs.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Database(_) | ServiceError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => ServiceError::NotFound(what),
            DatabaseError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Database(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(e: ValidationErrors) -> Self {
        // Flatten to "field: message" pairs in a stable order.
        let mut problems: Vec<String> = e
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |err| match &err.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: invalid ({})", field, err.code),
                })
            })
            .collect();
        problems.sort();
        ServiceError::ValidationFailed(problems.join("; "))
    }
}

/// Lets handlers and extractors return `ServiceError` directly; the body is
/// the standard error envelope.
impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::Database(_) | ServiceError::Internal(_) => error!("{}", self),
            _ => debug!("Request rejected: {}", self),
        }
        HttpResponse::build(self.status())
            .json(ApiResponse::<()>::error(self.code(), &self.public_message()))
    }
}
