//! # Persisted Snapshot Format
//!
//! One storage entry per persisted slice.
//!
//! ```text
//! key:   "{root_key}:{slice}"            e.g. "vielra:app"
//! value: {
//!          "format":   1,                envelope version
//!          "version":  <Slice::VERSION>, sub-state shape version
//!          "saved_at": "2024-...Z",
//!          "state":    { ...permitted fields... }
//!        }
//! ```
//!
//! Readers ignore unknown envelope fields. A `format` they do not know, or a
//! `version` the slice cannot migrate, resets that slice only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vielra_core::{Action, DynSlice, SliceValue, SNAPSHOT_FORMAT};

use crate::error::{StorageError, StorageResult};

/// Storage key of a slice.
pub fn slice_key(root_key: &str, slice: &str) -> String {
    format!("{root_key}:{slice}")
}

/// Serialized form of one slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    pub format: u32,
    pub version: u32,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    pub state: Value,
}

impl SnapshotEnvelope {
    pub fn new(version: u32, state: Value) -> Self {
        SnapshotEnvelope {
            format: SNAPSHOT_FORMAT,
            version,
            saved_at: Some(Utc::now()),
            state,
        }
    }

    pub fn to_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StorageError::write(key, e))
    }

    pub fn from_bytes(key: &str, bytes: &[u8]) -> StorageResult<Self> {
        let envelope: SnapshotEnvelope =
            serde_json::from_slice(bytes).map_err(|e| StorageError::deserialize(key, e))?;
        if envelope.format != SNAPSHOT_FORMAT {
            return Err(StorageError::deserialize(
                key,
                format!(
                    "unsupported snapshot format {} (expected {SNAPSHOT_FORMAT})",
                    envelope.format
                ),
            ));
        }
        Ok(envelope)
    }
}

/// Persistable JSON of a sub-state, `None` if the slice is not persisted.
pub fn encode_state<A: Action>(
    slice: &dyn DynSlice<A>,
    value: &SliceValue,
    key: &str,
) -> StorageResult<Option<Value>> {
    slice
        .encode(value)
        .map_err(|e| StorageError::write(key, e))
}

/// Decodes stored bytes and merges them into the slice defaults.
pub fn decode_slice<A: Action>(
    slice: &dyn DynSlice<A>,
    key: &str,
    bytes: &[u8],
) -> StorageResult<SliceValue> {
    let envelope = SnapshotEnvelope::from_bytes(key, bytes)?;
    slice
        .restore(envelope.version, envelope.state)
        .map_err(|e| StorageError::deserialize(key, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_format() {
        assert_eq!(slice_key("vielra", "auth"), "vielra:auth");
    }

    #[test]
    fn test_unknown_envelope_fields_are_ignored() {
        let bytes = br#"{"format":1,"version":3,"state":{"a":1},"extra":"x"}"#;
        let envelope = SnapshotEnvelope::from_bytes("k", bytes).unwrap();
        assert_eq!(envelope.version, 3);
        assert_eq!(envelope.state, json!({ "a": 1 }));
        assert!(envelope.saved_at.is_none());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let bytes = br#"{"format":9,"version":1,"state":{}}"#;
        let err = SnapshotEnvelope::from_bytes("k", bytes).unwrap_err();
        assert!(err.is_per_key());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(SnapshotEnvelope::from_bytes("k", b"\x00\xffnot json").is_err());
    }
}
