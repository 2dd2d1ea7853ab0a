//! # Slice Registry and Root Reducer
//!
//! The registry collects slices in a fixed order; composing it yields the
//! root reducer that the store runs on every dispatch.
//!
//! ## Composition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       RootReducer::reduce                               │
//! │                                                                         │
//! │   tree(rev n)                       action                              │
//! │   ┌──────────┐                        │                                 │
//! │   │ app   ───┼──► app.reduce ─────────┤  None ─► same Arc               │
//! │   │ auth  ───┼──► auth.reduce ────────┤  Some ─► new Arc                │
//! │   │ ...      │                        │                                 │
//! │   └──────────┘                        ▼                                 │
//! │                               tree(rev n+1), same keys, same order      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::action::Action;
use crate::error::{ConfigurationError, CoreError, CoreResult};
use crate::slice::{DynSlice, Slice, SliceAdapter, SliceValue};
use crate::tree::StateTree;

// =============================================================================
// Slice Registry
// =============================================================================

/// Ordered set of slices for one store.
pub struct SliceRegistry<A: Action> {
    slices: Vec<Box<dyn DynSlice<A>>>,
}

impl<A: Action> Default for SliceRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> SliceRegistry<A> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        SliceRegistry { slices: Vec::new() }
    }

    /// Registers a slice. Registration order is composition order.
    ///
    /// ## Errors
    /// `DuplicateSlice` if a slice with the same name is already registered.
    pub fn register<S: Slice<A>>(&mut self, slice: S) -> Result<&mut Self, ConfigurationError> {
        if self.contains(S::NAME) {
            return Err(ConfigurationError::DuplicateSlice(S::NAME.to_string()));
        }
        debug!(slice = S::NAME, version = S::VERSION, "Registered slice");
        self.slices.push(Box::new(SliceAdapter::new(slice)));
        Ok(self)
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with<S: Slice<A>>(mut self, slice: S) -> Result<Self, ConfigurationError> {
        self.register(slice)?;
        Ok(self)
    }

    /// Returns true if a slice with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.slices.iter().any(|s| s.name() == name)
    }

    /// Registered names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.slices.iter().map(|s| s.name()).collect()
    }

    /// Number of registered slices.
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Consumes the registry and produces the root reducer.
    pub fn compose(self) -> RootReducer<A> {
        RootReducer {
            slices: self.slices.into(),
        }
    }
}

// =============================================================================
// Root Reducer
// =============================================================================

/// Composed reducer over every registered slice.
pub struct RootReducer<A: Action> {
    slices: Arc<[Box<dyn DynSlice<A>>]>,
}

impl<A: Action> Clone for RootReducer<A> {
    fn clone(&self) -> Self {
        RootReducer {
            slices: Arc::clone(&self.slices),
        }
    }
}

impl<A: Action> fmt::Debug for RootReducer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootReducer")
            .field("slices", &self.names())
            .finish()
    }
}

impl<A: Action> RootReducer<A> {
    /// Slice names in composition order.
    pub fn names(&self) -> Vec<&'static str> {
        self.slices.iter().map(|s| s.name()).collect()
    }

    /// Iterates the type-erased slices in composition order.
    pub fn slices(&self) -> impl Iterator<Item = &dyn DynSlice<A>> {
        self.slices.iter().map(|s| s.as_ref())
    }

    /// Looks up a slice by name.
    pub fn slice(&self, name: &str) -> Option<&dyn DynSlice<A>> {
        self.slices().find(|s| s.name() == name)
    }

    /// Tree with every slice at its initial sub-state.
    pub fn initial_tree(&self) -> StateTree {
        StateTree::from_parts(0, self.slices.iter().map(|s| (s.name(), s.initial())))
    }

    /// Applies one action to every slice.
    ///
    /// Always yields a new tree with the next revision. Sub-states of slices
    /// that did not change keep their `Arc`.
    pub fn reduce(&self, tree: &StateTree, action: &A) -> StateTree {
        let entries = self.slices.iter().map(|slice| {
            let name = slice.name();
            let current = match tree.raw(name) {
                Some(value) => value.clone(),
                None => slice.initial(),
            };
            let next = slice.reduce(&current, action).unwrap_or(current);
            (name, next)
        });
        StateTree::from_parts(tree.revision() + 1, entries.collect::<Vec<_>>())
    }

    /// Builds a tree from restored sub-states, falling back to defaults.
    ///
    /// Names that are not registered are ignored.
    pub fn assemble(
        &self,
        revision: u64,
        mut restored: impl FnMut(&'static str) -> Option<SliceValue>,
    ) -> StateTree {
        let entries = self
            .slices
            .iter()
            .map(|s| (s.name(), restored(s.name()).unwrap_or_else(|| s.initial())))
            .collect::<Vec<_>>();
        StateTree::from_parts(revision, entries)
    }

    /// Structural equality of two trees over every registered slice.
    pub fn trees_equal(&self, a: &StateTree, b: &StateTree) -> bool {
        self.slices.iter().all(|s| match (a.raw(s.name()), b.raw(s.name())) {
            (Some(x), Some(y)) => Arc::ptr_eq(x, y) || s.state_eq(x, y),
            _ => false,
        })
    }

    /// JSON form of the full tree, keyed by slice name.
    pub fn to_json(&self, tree: &StateTree) -> CoreResult<Value> {
        let mut object = Map::new();
        for slice in self.slices.iter() {
            let value = tree
                .raw(slice.name())
                .ok_or_else(|| CoreError::UnknownSlice(slice.name().to_string()))?;
            object.insert(slice.name().to_string(), slice.to_json(value)?);
        }
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slice::Persistence;
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone)]
    enum TestAction {
        SetToken(String),
        SetLocale(String),
        Unrelated,
    }

    impl Action for TestAction {
        fn kind(&self) -> &'static str {
            match self {
                TestAction::SetToken(_) => "auth/setToken",
                TestAction::SetLocale(_) => "settings/setLocale",
                TestAction::Unrelated => "other/unrelated",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct AuthState {
        token: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct SettingsState {
        locale: String,
    }

    struct Auth;
    struct Settings;

    impl Slice<TestAction> for Auth {
        const NAME: &'static str = "auth";
        type State = AuthState;

        fn initial_state(&self) -> AuthState {
            AuthState { token: None }
        }

        fn reduce(&self, _state: &AuthState, action: &TestAction) -> Option<AuthState> {
            match action {
                TestAction::SetToken(t) => Some(AuthState {
                    token: Some(t.clone()),
                }),
                _ => None,
            }
        }

        fn persistence(&self) -> Persistence {
            Persistence::All
        }
    }

    impl Slice<TestAction> for Settings {
        const NAME: &'static str = "settings";
        type State = SettingsState;

        fn initial_state(&self) -> SettingsState {
            SettingsState {
                locale: "en".into(),
            }
        }

        fn reduce(&self, _state: &SettingsState, action: &TestAction) -> Option<SettingsState> {
            match action {
                TestAction::SetLocale(l) => Some(SettingsState { locale: l.clone() }),
                _ => None,
            }
        }
    }

    fn reducer() -> RootReducer<TestAction> {
        SliceRegistry::new()
            .with(Auth)
            .unwrap()
            .with(Settings)
            .unwrap()
            .compose()
    }

    #[test]
    fn test_duplicate_slice_is_rejected() {
        let mut registry = SliceRegistry::<TestAction>::new();
        registry.register(Auth).unwrap();
        let err = registry.register(Auth).err().unwrap();
        assert_eq!(err, ConfigurationError::DuplicateSlice("auth".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_set_token_scenario() {
        let reducer = reducer();
        let tree = reducer.initial_tree();
        let next = reducer.reduce(&tree, &TestAction::SetToken("abc".into()));

        assert_eq!(
            reducer.to_json(&next).unwrap(),
            json!({ "auth": { "token": "abc" }, "settings": { "locale": "en" } })
        );
        assert_eq!(next.revision(), tree.revision() + 1);
        assert!(!tree.same_slice(&next, "auth"));
        assert!(tree.same_slice(&next, "settings"));
    }

    #[test]
    fn test_unhandled_action_keeps_every_slice() {
        let reducer = reducer();
        let tree = reducer.initial_tree();
        let next = reducer.reduce(&tree, &TestAction::Unrelated);

        assert_eq!(next.revision(), 1);
        assert!(tree.same_as(&next));
        assert!(reducer.trees_equal(&tree, &next));
    }

    #[test]
    fn test_assemble_falls_back_to_defaults() {
        let reducer = reducer();
        let tree = reducer.assemble(0, |name| {
            (name == "auth").then(|| {
                Arc::new(AuthState {
                    token: Some("t".into()),
                }) as SliceValue
            })
        });
        assert_eq!(
            tree.slice::<Auth, _>().and_then(|a| a.token.as_deref()),
            Some("t")
        );
        assert_eq!(tree.slice::<Settings, _>().unwrap().locale, "en");
    }

    fn action_strategy() -> impl Strategy<Value = TestAction> {
        prop_oneof![
            "[a-z]{0,6}".prop_map(TestAction::SetToken),
            "[a-z]{2}".prop_map(TestAction::SetLocale),
            Just(TestAction::Unrelated),
        ]
    }

    proptest! {
        #[test]
        fn prop_keys_are_exactly_registered_names(
            actions in proptest::collection::vec(action_strategy(), 0..40)
        ) {
            let reducer = reducer();
            let mut tree = reducer.initial_tree();
            for action in &actions {
                tree = reducer.reduce(&tree, action);
            }
            prop_assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["auth", "settings"]);
            prop_assert_eq!(tree.revision(), actions.len() as u64);
        }

        #[test]
        fn prop_foreign_actions_pass_through(
            actions in proptest::collection::vec(action_strategy(), 0..40)
        ) {
            let reducer = reducer();
            let mut tree = reducer.initial_tree();
            for action in &actions {
                let next = reducer.reduce(&tree, action);
                match action {
                    TestAction::SetToken(_) => prop_assert!(tree.same_slice(&next, "settings")),
                    TestAction::SetLocale(_) => prop_assert!(tree.same_slice(&next, "auth")),
                    TestAction::Unrelated => prop_assert!(tree.same_as(&next)),
                }
                tree = next;
            }
        }
    }
}
