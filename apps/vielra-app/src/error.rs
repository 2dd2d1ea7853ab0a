//! # Application Error Type
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow at Startup                                │
//! │                                                                         │
//! │  ConfigurationError ──► AppError::Configuration ──► exit non-zero      │
//! │  config file / env  ──► AppError::Config        ──► exit non-zero      │
//! │  StorageError       ──► AppError::Storage       ──► exit non-zero      │
//! │                         (only when the database cannot be opened;      │
//! │                          read faults during rehydration fall back to   │
//! │                          defaults and never reach here)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use vielra_core::ConfigurationError;
use vielra_effects::EffectError;
use vielra_store::{StorageError, StoreError};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Slice, effect or translation wiring is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Config file could not be read, parsed or written.
    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),
}

impl AppError {
    /// Returns true if retrying startup cannot help.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Configuration(_) | AppError::Config(_))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Config(err.to_string())
    }
}
