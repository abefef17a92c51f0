use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Already paid: {0}")]
    AlreadyPaid(String),

    #[error("Gateway rejected the request: {0}")]
    GatewayRejected(String),

    #[error("Gateway unavailable")]
    GatewayUnavailable(#[from] reqwest::Error),

    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::CapacityExceeded(_) => StatusCode::BAD_REQUEST,
            AppError::AlreadyPaid(_) => StatusCode::CONFLICT,
            AppError::GatewayRejected(_) => StatusCode::BAD_GATEWAY,
            AppError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::VerificationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            AppError::AlreadyPaid(_) => "ALREADY_PAID",
            AppError::GatewayRejected(_) => "GATEWAY_REJECTED",
            AppError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
            AppError::VerificationFailed(_) => "VERIFICATION_FAILED",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Message that is safe to show to a client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::CapacityExceeded(msg)
            | AppError::AlreadyPaid(msg)
            | AppError::GatewayRejected(msg)
            | AppError::VerificationFailed(msg) => msg.clone(),
            AppError::GatewayUnavailable(_) => "The payment provider could not be reached".to_string(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
        }
    }

    pub(crate) fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::NotFound(msg)
            | AppError::CapacityExceeded(msg)
            | AppError::AlreadyPaid(msg)
            | AppError::VerificationFailed(msg) => {
                warn!(code = self.code(), message = %msg, "Request rejected");
            }
            AppError::GatewayRejected(msg) | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::GatewayUnavailable(e) => {
                error!(error = ?e, "Payment gateway request failed");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Do not expose internal details in the API response
        error_response(code, self.public_message(), None, status)
    }
}
