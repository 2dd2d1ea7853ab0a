//! # Store Error Types
//!
//! Error types for the store runtime and the storage collaborator.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / snapshot decode failure                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StorageError ← recoverable: gate falls back to slice defaults,        │
//! │       │         write-back logs and retries on the next change         │
//! │       ▼                                                                 │
//! │  StoreError   ← dispatch rejection, closed handles                     │
//! │                                                                         │
//! │  Neither ever terminates the process.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Storage Error
// =============================================================================

/// Durable storage failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Reading a key failed.
    #[error("Storage read failed for '{key}': {reason}")]
    Read { key: String, reason: String },

    /// Writing or removing a key failed.
    #[error("Storage write failed for '{key}': {reason}")]
    Write { key: String, reason: String },

    /// Stored bytes could not be turned back into state.
    #[error("Stored value for '{key}' is unreadable: {reason}")]
    Deserialize { key: String, reason: String },

    /// Backend could not be opened.
    #[error("Storage connection failed: {0}")]
    Connection(String),

    /// Schema migration failed.
    #[error("Storage migration failed: {0}")]
    Migration(String),
}

impl StorageError {
    pub fn read(key: impl Into<String>, reason: impl ToString) -> Self {
        StorageError::Read {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn write(key: impl Into<String>, reason: impl ToString) -> Self {
        StorageError::Write {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    pub fn deserialize(key: impl Into<String>, reason: impl ToString) -> Self {
        StorageError::Deserialize {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if retrying the same operation may succeed.
    ///
    /// Unreadable data stays unreadable; I/O failures may be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Read { .. } | StorageError::Write { .. } | StorageError::Connection(_)
        )
    }

    /// Returns true if the error concerns a single key rather than the backend.
    pub fn is_per_key(&self) -> bool {
        matches!(self, StorageError::Deserialize { .. })
    }
}

// =============================================================================
// Store Error
// =============================================================================

/// Store runtime failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Early-dispatch buffer is full while rehydration is still running.
    #[error("Dispatch of '{kind}' rejected: {capacity} actions already waiting for rehydration")]
    DispatchRejected { kind: &'static str, capacity: usize },

    /// The persistence gate was already opened for this store.
    #[error("Persistence gate already opened")]
    AlreadyOpened,

    /// The background task behind a handle has stopped.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Storage failure surfaced to a caller that asked for it.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Slice encode/decode failure.
    #[error(transparent)]
    Core(#[from] vielra_core::CoreError),
}

impl StoreError {
    /// Returns true if the caller may retry later.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::DispatchRejected { .. } => true,
            StoreError::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(StorageError::read("k", "io").is_retryable());
        assert!(StorageError::Connection("locked".into()).is_retryable());
        assert!(!StorageError::deserialize("k", "bad json").is_retryable());
        assert!(StorageError::deserialize("k", "bad json").is_per_key());

        assert!(StoreError::DispatchRejected {
            kind: "app/setLanguage",
            capacity: 4
        }
        .is_retryable());
        assert!(!StoreError::AlreadyOpened.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::write("vielra:app", "disk full");
        assert_eq!(
            err.to_string(),
            "Storage write failed for 'vielra:app': disk full"
        );
    }
}
