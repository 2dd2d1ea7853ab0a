//! # Feature Slices
//!
//! One module per feature. Each owns its sub-state, its closed action enum
//! and the selectors over its own sub-state.
//!
//! | Module | Slice name | Persisted fields |
//! |--------|------------|------------------|
//! | [`app`] | `app` | already_launched, language, palette_mode |
//! | [`auth`] | `auth` | user, is_authenticated |
//! | [`settings`] | `settings` | none |
//! | [`phrasebook`] | `phrasebook` | categories, phrases |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod app;
pub mod auth;
pub mod phrasebook;
pub mod settings;

// =============================================================================
// Shared Request Tracking
// =============================================================================

/// Failure of a remote request as seen by the presentation layer.
///
/// `fields` carries server validation messages per input field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestError {
    pub message: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<String>>,
}

impl RequestError {
    pub fn message(message: impl Into<String>) -> Self {
        RequestError {
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_fields(message: impl Into<String>, fields: BTreeMap<String, Vec<String>>) -> Self {
        RequestError {
            message: message.into(),
            fields,
        }
    }

    /// Messages for one input field.
    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map_or(&[], Vec::as_slice)
    }
}

/// Loading/error status of one kind of request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestStatus {
    pub loading: bool,
    pub error: Option<RequestError>,
}

impl RequestStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        RequestStatus {
            loading: true,
            error: None,
        }
    }

    pub fn failed(error: RequestError) -> Self {
        RequestStatus {
            loading: false,
            error: Some(error),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}
