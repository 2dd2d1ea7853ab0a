//! # Error Types
//!
//! Error types for vielra-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vielra-core errors (this file)                                        │
//! │  ├── ConfigurationError - fatal at startup (duplicate slice, ...)      │
//! │  └── CoreError          - slice encode/decode failures                 │
//! │                                                                         │
//! │  vielra-store errors (separate crate)                                  │
//! │  └── StorageError       - recoverable, falls back to defaults          │
//! │                                                                         │
//! │  vielra-effects errors (separate crate)                                │
//! │  └── EffectFailure      - becomes a failure action                     │
//! │                                                                         │
//! │  Only ConfigurationError may terminate the process.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Configuration Error
// =============================================================================

/// Errors detected while assembling the application at startup.
///
/// These are programming or packaging mistakes. Initialization must halt
/// with the diagnostic rather than silently picking a winner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Two slices were registered under the same name.
    #[error("Slice '{0}' is already registered")]
    DuplicateSlice(String),

    /// Two effects were registered under the same key.
    #[error("Effect key '{0}' is already registered")]
    DuplicateEffect(String),

    /// Two feature modules define the same message key for one language.
    #[error(
        "Translation key '{key}' for language '{language}' is defined by both '{first}' and '{second}'"
    )]
    TranslationKeyCollision {
        language: String,
        key: String,
        first: String,
        second: String,
    },

    /// One feature module defines the same message key twice for one language.
    #[error("Translation key '{key}' for language '{language}' is defined twice by '{module}'")]
    DuplicateTranslationKey {
        module: String,
        language: String,
        key: String,
    },

    /// Two feature modules were registered with the same name.
    #[error("Translation module '{0}' is already registered")]
    DuplicateModule(String),

    /// Configuration value failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised while converting slice state to and from its persisted form.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Startup configuration error.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Slice state could not be serialized.
    #[error("Slice '{slice}' could not be encoded: {reason}")]
    Encode { slice: String, reason: String },

    /// Persisted slice state could not be deserialized.
    #[error("Slice '{slice}' could not be decoded: {reason}")]
    Decode { slice: String, reason: String },

    /// Persisted slice state was written by an incompatible shape version.
    #[error("Slice '{slice}' persisted version {found} is incompatible with version {expected}")]
    IncompatibleVersion {
        slice: String,
        found: u32,
        expected: u32,
    },

    /// No slice is registered under this name.
    #[error("Unknown slice: {0}")]
    UnknownSlice(String),

    /// Language code is not one of the supported languages.
    #[error("Unknown language code: '{0}'. Valid options: en, id, vi")]
    UnknownLanguage(String),

    /// Palette mode is neither light nor dark.
    #[error("Unknown palette mode: '{0}'. Valid options: light, dark")]
    UnknownPaletteMode(String),
}

impl CoreError {
    /// Returns true if the error only affects one slice's persisted data.
    ///
    /// Such errors are absorbed by resetting that slice to its defaults.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::Encode { .. } | CoreError::Decode { .. } | CoreError::IncompatibleVersion { .. }
        )
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigurationError::DuplicateSlice("auth".to_string());
        assert_eq!(err.to_string(), "Slice 'auth' is already registered");

        let err = ConfigurationError::TranslationKeyCollision {
            language: "en".into(),
            key: "common.ok".into(),
            first: "app".into(),
            second: "auth".into(),
        };
        assert!(err.to_string().contains("common.ok"));
        assert!(err.to_string().contains("'app' and 'auth'"));

        let err = ConfigurationError::DuplicateTranslationKey {
            module: "app".into(),
            language: "en".into(),
            key: "common.ok".into(),
        };
        assert!(err.to_string().contains("defined twice by 'app'"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(CoreError::Decode {
            slice: "auth".into(),
            reason: "bad".into()
        }
        .is_recoverable());
        assert!(CoreError::IncompatibleVersion {
            slice: "auth".into(),
            found: 1,
            expected: 2
        }
        .is_recoverable());
        assert!(!CoreError::from(ConfigurationError::DuplicateSlice("app".into())).is_recoverable());
    }
}
