use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::auth::AuthError;
use crate::services::{
    CheckinError, ConsultationError, EventError, RegistrationError, SeatError,
};
use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        details: Option<Value>,
    },

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict {
            message: message.into(),
            details: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::StoreError(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::StoreError(e) if e.is_retryable() => "STORE_UNAVAILABLE",
            AppError::StoreError(_) => "STORE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict { message: msg, .. } => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::StoreError(e) => {
                error!(error = ?e, retryable = e.is_retryable(), "Store error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let (public_message, details) = match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => (msg, None),
            AppError::Conflict { message, details } => (message, details),
            AppError::StoreError(e) if e.is_retryable() => (
                "The data store is temporarily unavailable; re-check state before retrying"
                    .to_string(),
                None,
            ),
            AppError::StoreError(_) => ("A database error occurred".to_string(), None),
            AppError::InternalServerError(_) => ("Internal server error".to_string(), None),
        };

        error_response(code, public_message, details, status)
    }
}

impl From<SeatError> for AppError {
    fn from(err: SeatError) -> Self {
        match err {
            SeatError::EventNotFound(_) => AppError::NotFound(err.to_string()),
            SeatError::EventInactive(_)
            | SeatError::UnknownTier { .. }
            | SeatError::PriceMismatch { .. }
            | SeatError::InvalidUnits => AppError::ValidationError(err.to_string()),
            SeatError::SeatsExhausted {
                ref tier,
                remaining,
            } => AppError::Conflict {
                details: Some(json!({ "tier": tier, "remaining": remaining })),
                message: err.to_string(),
            },
            SeatError::Store(e) => AppError::StoreError(e),
        }
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Seat(e) => e.into(),
            RegistrationError::Duplicate { ref existing_id } => AppError::Conflict {
                details: Some(json!({ "registrationId": existing_id })),
                message: err.to_string(),
            },
            RegistrationError::Invalid(msg) => AppError::ValidationError(msg),
            RegistrationError::NotFound(_) => AppError::NotFound(err.to_string()),
            RegistrationError::CheckedIn(_) => AppError::conflict(err.to_string()),
            RegistrationError::Checkin(e) => e.into(),
            RegistrationError::Store(e) => AppError::StoreError(e),
        }
    }
}

impl From<CheckinError> for AppError {
    fn from(err: CheckinError) -> Self {
        match err {
            CheckinError::InvalidSelector(_) => AppError::ValidationError(err.to_string()),
            CheckinError::NotFound => AppError::NotFound(err.to_string()),
            CheckinError::Cancelled(_) => AppError::conflict(err.to_string()),
            CheckinError::Store(e) => AppError::StoreError(e),
        }
    }
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::NotFound(_) => AppError::NotFound(err.to_string()),
            EventError::Invalid(msg) => AppError::ValidationError(msg),
            EventError::Store(e) => AppError::StoreError(e),
        }
    }
}

impl From<ConsultationError> for AppError {
    fn from(err: ConsultationError) -> Self {
        match err {
            ConsultationError::Invalid(msg) => AppError::ValidationError(msg),
            ConsultationError::NotFound(_) => AppError::NotFound(err.to_string()),
            ConsultationError::Store(e) => AppError::StoreError(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Hash(_) | AuthError::Signing(_) => {
                AppError::InternalServerError(err.to_string())
            }
            AuthError::InsufficientRole => AppError::Forbidden(err.to_string()),
            _ => AppError::AuthError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(CheckinError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(CheckinError::InvalidSelector("garbage".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(StoreError::Unavailable("pool timed out".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_seats_exhausted_carries_details() {
        let err = AppError::from(SeatError::SeatsExhausted {
            tier: "gold".into(),
            remaining: 0,
        });
        assert_eq!(err.code(), "CONFLICT");
        match err {
            AppError::Conflict { details, .. } => {
                assert_eq!(details, Some(json!({ "tier": "gold", "remaining": 0 })));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
