//! # Slices
//!
//! A slice is an independently owned unit of state: a sub-state shape, a
//! closed set of actions it handles and a pure transition function.
//!
//! ## Slice Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Slice<A>                                       │
//! │                                                                         │
//! │  NAME ─────────────► unique key in the state tree                      │
//! │  VERSION ──────────► shape version written into persisted snapshots    │
//! │  initial_state() ──► defaults (also the base for rehydration)          │
//! │  reduce(&s, &a) ───► Some(next) when handled, None = pass through      │
//! │  persistence() ────► Disabled | All | Allow([..]) | Deny([..])         │
//! │  migrate(v, json) ─► optional upgrade of an older persisted shape      │
//! │                                                                         │
//! │  A reducer sees ONLY its own sub-state. Cross-slice reads happen in    │
//! │  selectors over the composed StateTree.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry stores slices behind [`DynSlice`], a type-erased view that
//! the root reducer and the persistence gate work with.

use std::any::Any;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::action::Action;
use crate::error::{CoreError, CoreResult};

/// Type-erased slice sub-state as stored in the [`StateTree`](crate::StateTree).
pub type SliceValue = Arc<dyn Any + Send + Sync>;

// =============================================================================
// Persistence Policy
// =============================================================================

/// Which part of a slice's sub-state is written to durable storage.
///
/// Allow and deny lists name top-level fields of the serialized sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persistence {
    /// Slice is never persisted.
    #[default]
    Disabled,

    /// Entire sub-state is persisted.
    All,

    /// Only the listed fields are persisted.
    Allow(&'static [&'static str]),

    /// Every field except the listed ones is persisted.
    Deny(&'static [&'static str]),
}

impl Persistence {
    /// Returns true if the slice opted in to persistence.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Persistence::Disabled)
    }

    /// Returns true if the given top-level field may be persisted/restored.
    pub fn permits(&self, field: &str) -> bool {
        match self {
            Persistence::Disabled => false,
            Persistence::All => true,
            Persistence::Allow(fields) => fields.contains(&field),
            Persistence::Deny(fields) => !fields.contains(&field),
        }
    }

    /// Drops every field this policy does not permit.
    pub fn filter(&self, value: Value) -> Value {
        match value {
            Value::Object(mut fields) => {
                fields.retain(|name, _| self.permits(name));
                Value::Object(fields)
            }
            other => other,
        }
    }
}

// =============================================================================
// Slice Trait
// =============================================================================

/// Contract implemented by every feature slice.
///
/// `A` is the store's root action type. A slice matches only the variants it
/// owns and returns `None` for everything else.
pub trait Slice<A: Action>: Send + Sync + 'static {
    /// Unique key of the slice in the state tree.
    const NAME: &'static str;

    /// Version of the sub-state shape.
    const VERSION: u32 = 1;

    /// Sub-state owned by this slice.
    type State: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Returns the default sub-state.
    fn initial_state(&self) -> Self::State;

    /// Applies an action. `None` means the action is not handled here.
    fn reduce(&self, state: &Self::State, action: &A) -> Option<Self::State>;

    /// Persistence policy. Slices are not persisted unless they opt in.
    fn persistence(&self) -> Persistence {
        Persistence::Disabled
    }

    /// Upgrades a persisted value written by an older `VERSION`.
    ///
    /// Returning `None` discards the persisted value for this slice.
    fn migrate(&self, from_version: u32, persisted: Value) -> Option<Value> {
        let _ = (from_version, persisted);
        None
    }
}

// =============================================================================
// Type-Erased Slice
// =============================================================================

/// Object-safe view of a registered slice.
pub trait DynSlice<A: Action>: Send + Sync {
    /// Slice name.
    fn name(&self) -> &'static str;

    /// Sub-state shape version.
    fn version(&self) -> u32;

    /// Persistence policy.
    fn persistence(&self) -> Persistence;

    /// Fresh default sub-state.
    fn initial(&self) -> SliceValue;

    /// Applies an action; `None` when the sub-state is unchanged.
    fn reduce(&self, current: &SliceValue, action: &A) -> Option<SliceValue>;

    /// Structural equality of two sub-states of this slice.
    fn state_eq(&self, a: &SliceValue, b: &SliceValue) -> bool;

    /// Full JSON form of the sub-state.
    fn to_json(&self, value: &SliceValue) -> CoreResult<Value>;

    /// Persistable JSON form, `None` if the slice is not persisted.
    fn encode(&self, value: &SliceValue) -> CoreResult<Option<Value>>;

    /// Merges a persisted value into the defaults.
    ///
    /// Permitted fields present in `persisted` win, absent fields keep their
    /// default, unknown fields are ignored.
    fn restore(&self, version: u32, persisted: Value) -> CoreResult<SliceValue>;
}

/// Adapter from a typed [`Slice`] to [`DynSlice`].
pub(crate) struct SliceAdapter<S, A> {
    slice: S,
    _action: PhantomData<fn(&A)>,
}

impl<S, A> SliceAdapter<S, A> {
    pub(crate) fn new(slice: S) -> Self {
        SliceAdapter {
            slice,
            _action: PhantomData,
        }
    }
}

impl<S, A> SliceAdapter<S, A>
where
    A: Action,
    S: Slice<A>,
{
    fn typed<'a>(&self, value: &'a SliceValue) -> CoreResult<&'a S::State> {
        value.downcast_ref::<S::State>().ok_or_else(|| CoreError::Encode {
            slice: S::NAME.to_string(),
            reason: "sub-state has an unexpected type".to_string(),
        })
    }

    fn decode_error(reason: impl ToString) -> CoreError {
        CoreError::Decode {
            slice: S::NAME.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl<S, A> DynSlice<A> for SliceAdapter<S, A>
where
    A: Action,
    S: Slice<A>,
{
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn version(&self) -> u32 {
        S::VERSION
    }

    fn persistence(&self) -> Persistence {
        self.slice.persistence()
    }

    fn initial(&self) -> SliceValue {
        Arc::new(self.slice.initial_state())
    }

    fn reduce(&self, current: &SliceValue, action: &A) -> Option<SliceValue> {
        let state = current.downcast_ref::<S::State>()?;
        let next = self.slice.reduce(state, action)?;

        // Equal output keeps the previous Arc so untouched paths stay identical.
        if next == *state {
            return None;
        }
        Some(Arc::new(next))
    }

    fn state_eq(&self, a: &SliceValue, b: &SliceValue) -> bool {
        match (a.downcast_ref::<S::State>(), b.downcast_ref::<S::State>()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn to_json(&self, value: &SliceValue) -> CoreResult<Value> {
        let state = self.typed(value)?;
        serde_json::to_value(state).map_err(|e| CoreError::Encode {
            slice: S::NAME.to_string(),
            reason: e.to_string(),
        })
    }

    fn encode(&self, value: &SliceValue) -> CoreResult<Option<Value>> {
        let policy = self.slice.persistence();
        if !policy.is_enabled() {
            return Ok(None);
        }
        Ok(Some(policy.filter(self.to_json(value)?)))
    }

    fn restore(&self, version: u32, persisted: Value) -> CoreResult<SliceValue> {
        let policy = self.slice.persistence();

        let persisted = if version == S::VERSION {
            persisted
        } else {
            self.slice
                .migrate(version, persisted)
                .ok_or(CoreError::IncompatibleVersion {
                    slice: S::NAME.to_string(),
                    found: version,
                    expected: S::VERSION,
                })?
        };

        let defaults = serde_json::to_value(self.slice.initial_state()).map_err(|e| {
            CoreError::Encode {
                slice: S::NAME.to_string(),
                reason: e.to_string(),
            }
        })?;

        let merged = match (defaults, persisted) {
            (Value::Object(mut base), Value::Object(fields)) => {
                for (name, value) in fields {
                    if policy.permits(&name) && base.contains_key(&name) {
                        base.insert(name, value);
                    }
                }
                Value::Object(base)
            }
            (Value::Object(_), other) => {
                return Err(Self::decode_error(format!(
                    "expected an object, found {}",
                    json_kind(&other)
                )));
            }
            (_, whole) if policy == Persistence::All => whole,
            (defaults, _) => defaults,
        };

        let state: S::State = serde_json::from_value(merged).map_err(Self::decode_error)?;
        Ok(Arc::new(state))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone)]
    enum TestAction {
        Rename(String),
        Bump,
        Other,
    }

    impl Action for TestAction {
        fn kind(&self) -> &'static str {
            match self {
                TestAction::Rename(_) => "profile/rename",
                TestAction::Bump => "profile/bump",
                TestAction::Other => "other/noop",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        visits: u32,
        draft: Option<String>,
    }

    struct ProfileSlice;

    impl Slice<TestAction> for ProfileSlice {
        const NAME: &'static str = "profile";
        const VERSION: u32 = 2;
        type State = Profile;

        fn initial_state(&self) -> Profile {
            Profile {
                name: "guest".into(),
                visits: 0,
                draft: None,
            }
        }

        fn reduce(&self, state: &Profile, action: &TestAction) -> Option<Profile> {
            match action {
                TestAction::Rename(name) => Some(Profile {
                    name: name.clone(),
                    ..state.clone()
                }),
                TestAction::Bump => Some(Profile {
                    visits: state.visits + 1,
                    ..state.clone()
                }),
                TestAction::Other => None,
            }
        }

        fn persistence(&self) -> Persistence {
            Persistence::Deny(&["draft"])
        }

        fn migrate(&self, from_version: u32, persisted: Value) -> Option<Value> {
            // v1 stored the name under "username".
            if from_version != 1 {
                return None;
            }
            let name = persisted.get("username")?.clone();
            Some(json!({ "name": name }))
        }
    }

    fn adapter() -> SliceAdapter<ProfileSlice, TestAction> {
        SliceAdapter::new(ProfileSlice)
    }

    #[test]
    fn test_policy_permits() {
        assert!(!Persistence::Disabled.permits("a"));
        assert!(Persistence::All.permits("a"));
        assert!(Persistence::Allow(&["a"]).permits("a"));
        assert!(!Persistence::Allow(&["a"]).permits("b"));
        assert!(!Persistence::Deny(&["a"]).permits("a"));
        assert!(Persistence::Deny(&["a"]).permits("b"));
    }

    #[test]
    fn test_unhandled_action_passes_through() {
        let slice = adapter();
        let initial = slice.initial();
        assert!(slice.reduce(&initial, &TestAction::Other).is_none());
    }

    #[test]
    fn test_equal_output_is_not_a_change() {
        let slice = adapter();
        let initial = slice.initial();
        assert!(slice
            .reduce(&initial, &TestAction::Rename("guest".into()))
            .is_none());
        assert!(slice.reduce(&initial, &TestAction::Bump).is_some());
    }

    #[test]
    fn test_encode_applies_deny_list() {
        let slice = adapter();
        let value: SliceValue = Arc::new(Profile {
            name: "ana".into(),
            visits: 3,
            draft: Some("unsent".into()),
        });
        let encoded = slice.encode(&value).unwrap().unwrap();
        assert_eq!(encoded, json!({ "name": "ana", "visits": 3 }));
    }

    #[test]
    fn test_restore_merges_into_defaults() {
        let slice = adapter();
        let restored = slice
            .restore(2, json!({ "name": "ana", "unknown": true, "draft": "x" }))
            .unwrap();
        let profile = restored.downcast_ref::<Profile>().unwrap();
        assert_eq!(profile.name, "ana");
        assert_eq!(profile.visits, 0);
        assert_eq!(profile.draft, None);
    }

    #[test]
    fn test_restore_migrates_older_version() {
        let slice = adapter();
        let restored = slice.restore(1, json!({ "username": "bo" })).unwrap();
        assert_eq!(restored.downcast_ref::<Profile>().unwrap().name, "bo");
    }

    #[test]
    fn test_restore_rejects_unknown_version() {
        let slice = adapter();
        let err = slice.restore(7, json!({ "name": "x" })).err().unwrap();
        assert!(matches!(err, CoreError::IncompatibleVersion { found: 7, .. }));
    }

    #[test]
    fn test_restore_rejects_wrong_types() {
        let slice = adapter();
        assert!(slice.restore(2, json!({ "visits": "many" })).is_err());
        assert!(slice.restore(2, json!([1, 2, 3])).is_err());
    }
}
