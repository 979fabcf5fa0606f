//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the mapping
//! from core port errors to HTTP rejections used by every handler.

use crate::config::ConfigError;
use axum::http::StatusCode;
use edugen_core::ports::PortError;
use tracing::{error, warn};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The rejection type every handler returns.
pub type Rejection = (StatusCode, String);

pub fn status_for(err: &PortError) -> StatusCode {
    match err {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Invalid(_) | PortError::AlreadyClaimedToday => StatusCode::BAD_REQUEST,
        PortError::Unauthorized => StatusCode::UNAUTHORIZED,
        PortError::Forbidden(_) => StatusCode::FORBIDDEN,
        PortError::DuplicateAccount(_) | PortError::AlreadyCompleted(_) => StatusCode::CONFLICT,
        PortError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PortError::ReferralCodeTaken | PortError::Unexpected(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Converts a port error into a handler rejection, logging it on the way out.
///
/// Server-side failures are logged in full but reported generically; client
/// errors carry their message back to the caller.
pub fn reject(context: &str, err: PortError) -> Rejection {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("{}: {:?}", context, err);
        let message = if err.is_retryable() {
            format!("{} failed, please try again later", context)
        } else {
            format!("{} failed", context)
        };
        (status, message)
    } else {
        warn!("{}: {}", context, err);
        (status, err.to_string())
    }
}
