//! # Effect Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Effect Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │   Transport     │  │  EffectFailure  │  │     EffectError         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Network        │  │  Transport      │  │  ChannelError           │ │
//! │  │  Unauthorized   │  │  Timeout        │  │  Configuration          │ │
//! │  │  Unprocessable  │  │  Panicked       │  │                         │ │
//! │  │  Status         │  │  Rejected       │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  EffectFailure never escapes the orchestrator: it becomes the          │
//! │  effect's failure action. EffectError is for handle operations.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use vielra_core::modules::RequestError;
use vielra_core::ConfigurationError;

/// Result type alias for orchestrator handle operations.
pub type EffectResult<T> = Result<T, EffectError>;

// =============================================================================
// Server Validation Error
// =============================================================================

/// Body of a 422 response.
///
/// ```json
/// { "message": "The given data was invalid.",
///   "errors": { "email": ["The email has already been taken."] } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerValidationError {
    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
}

impl From<ServerValidationError> for RequestError {
    fn from(err: ServerValidationError) -> Self {
        RequestError::with_fields(err.message, err.errors)
    }
}

// =============================================================================
// Transport Error
// =============================================================================

/// Failures reported by an [`ApiClient`](crate::api::ApiClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Request never reached the server or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// Server rejected the bearer token (401).
    #[error("Unauthorized")]
    Unauthorized,

    /// Server rejected the payload with field errors (422).
    #[error("Validation failed: {}", .0.message)]
    Unprocessable(ServerValidationError),

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network(_) => true,
            TransportError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::InvalidResponse(err.to_string())
    }
}

// =============================================================================
// Effect Failure
// =============================================================================

/// Why an effect run did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Deadline expired before the effect finished.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The effect panicked; the task boundary caught it.
    #[error("Effect panicked: {0}")]
    Panicked(String),

    /// Preconditions not met (e.g. no access token).
    #[error("{0}")]
    Rejected(String),
}

impl EffectFailure {
    pub fn is_retryable(&self) -> bool {
        match self {
            EffectFailure::Transport(err) => err.is_retryable(),
            EffectFailure::Timeout(_) => true,
            _ => false,
        }
    }

    /// Structured form stored in the owning slice.
    pub fn to_request_error(&self) -> RequestError {
        match self {
            EffectFailure::Transport(TransportError::Unprocessable(validation)) => {
                validation.clone().into()
            }
            other => RequestError::message(other.to_string()),
        }
    }
}

// =============================================================================
// Effect Error
// =============================================================================

/// Errors from orchestrator handle operations.
#[derive(Debug, Error)]
pub enum EffectError {
    /// Supervisor task is gone.
    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}
