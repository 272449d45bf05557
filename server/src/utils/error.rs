use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::ledger::LedgerError;
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

    #[error(transparent)]
    Ledger(LedgerError),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::EntityNotFound(what) => AppError::NotFound(what),
            LedgerError::ValidationError(msg) => AppError::ValidationError(msg),
            other => AppError::Ledger(other),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Ledger(LedgerError::InsufficientBalance { .. })
            | AppError::Ledger(LedgerError::PricingNotConfigured { .. })
            | AppError::Ledger(LedgerError::ValidationError(_)) => StatusCode::BAD_REQUEST,
            AppError::Ledger(LedgerError::EntityNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Ledger(LedgerError::InvalidState(_)) => StatusCode::CONFLICT,
            AppError::Ledger(LedgerError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Ledger(LedgerError::InsufficientBalance { .. }) => "INSUFFICIENT_BALANCE",
            AppError::Ledger(LedgerError::PricingNotConfigured { .. }) => "PRICING_NOT_CONFIGURED",
            AppError::Ledger(LedgerError::ValidationError(_)) => "VALIDATION_ERROR",
            AppError::Ledger(LedgerError::EntityNotFound(_)) => "NOT_FOUND",
            AppError::Ledger(LedgerError::InvalidState(_)) => "INVALID_STATE",
            AppError::Ledger(LedgerError::Storage(_)) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::Ledger(LedgerError::Storage(e)) => {
                error!(error = ?e, "Database error");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            _ => {
                warn!(code = self.code(), message = %self, "Request rejected");
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::Ledger(LedgerError::InsufficientBalance { shortfall, .. }) => {
                format!("Insufficient balance: {shortfall} more points are needed")
            }
            AppError::Ledger(LedgerError::Storage(_)) => "A database error occurred".to_string(),
            AppError::Ledger(other) => other.to_string(),
            AppError::InternalServerError(_) => "An unexpected error occurred".to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Ledger(LedgerError::InsufficientBalance {
                balance,
                requested,
                shortfall,
            }) => Some(json!({
                "balance": balance,
                "requested": requested,
                "shortfall": shortfall,
            })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Storage and internal failures never expose their cause
        error_response(code, self.public_message(), self.details(), status)
    }
}
