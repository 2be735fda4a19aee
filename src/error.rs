//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::logic::ledger::LedgerError;
use crate::logic::session::SessionError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Wallet errors
    WalletRequired,
    InvalidWallet(String),

    // Resource errors
    NotFound(String),
    Conflict(String),

    // Validation errors
    ValidationError(String),

    // Capacity errors
    ServiceUnavailable(String),

    // External service errors
    LedgerError(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::WalletRequired => (StatusCode::UNAUTHORIZED, "Wallet not connected"),
            AppError::InvalidWallet(msg) => (StatusCode::UNAUTHORIZED, msg.as_str()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.as_str()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, msg.as_str())
            }
            AppError::LedgerError(msg) => {
                tracing::error!("Ledger error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.as_str())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::WalletNotConnected => AppError::WalletRequired,
            SessionError::EmptyDomain
            | SessionError::InvalidConfidence
            | SessionError::SignedVoteMismatch => AppError::ValidationError(err.to_string()),
            SessionError::AlreadyAnalyzed(_)
            | SessionError::InvalidTransition { .. }
            | SessionError::VoteAlreadyCast
            | SessionError::VoteInFlight
            | SessionError::MissingProof
            | SessionError::NoPreparedVote
            | SessionError::WrongVoter => AppError::Conflict(err.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidTransaction(_) | LedgerError::InvalidSignature(_) => {
                AppError::ValidationError(err.to_string())
            }
            // one vote record per wallet and domain
            LedgerError::AccountAlreadyExists(_) => AppError::Conflict(err.to_string()),
            _ => AppError::LedgerError(err.to_string()),
        }
    }
}

impl From<crate::store::StoreError> for AppError {
    fn from(err: crate::store::StoreError) -> Self {
        AppError::ServiceUnavailable(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
