//! # State Tree
//!
//! The composed application state: one entry per registered slice, keyed by
//! slice name, in registration order.
//!
//! Every entry is an `Arc`. Producing a new tree clones the Arcs of untouched
//! slices, so `same_slice` can detect unchanged paths by pointer identity.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::action::Action;
use crate::slice::{Slice, SliceValue};

#[derive(Clone)]
struct TreeEntry {
    name: &'static str,
    value: SliceValue,
}

/// Immutable snapshot of the whole application state.
#[derive(Clone)]
pub struct StateTree {
    revision: u64,
    entries: Arc<[TreeEntry]>,
}

impl StateTree {
    pub(crate) fn from_parts(
        revision: u64,
        entries: impl IntoIterator<Item = (&'static str, SliceValue)>,
    ) -> Self {
        StateTree {
            revision,
            entries: entries
                .into_iter()
                .map(|(name, value)| TreeEntry { name, value })
                .collect(),
        }
    }

    /// Number of transitions that produced this tree. The initial tree is 0.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Slice names in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    /// Number of slices in the tree.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the tree holds no slices.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if a slice with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Type-erased sub-state of a slice.
    pub fn raw(&self, name: &str) -> Option<&SliceValue> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.value)
    }

    /// Typed sub-state of a slice.
    ///
    /// Returns `None` if the slice is unknown or `T` is not its state type.
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.raw(name).and_then(|v| v.downcast_ref::<T>())
    }

    /// Sub-state owned by slice `S`.
    ///
    /// ```rust,ignore
    /// let auth = tree.slice::<AuthSlice, _>();
    /// ```
    pub fn slice<S, A>(&self) -> Option<&S::State>
    where
        A: Action,
        S: Slice<A>,
    {
        self.get::<S::State>(S::NAME)
    }

    /// Returns true if both trees share the identical sub-state for `name`.
    pub fn same_slice(&self, other: &StateTree, name: &str) -> bool {
        match (self.raw(name), other.raw(name)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Returns true if every sub-state is pointer-identical to `other`'s.
    pub fn same_as(&self, other: &StateTree) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
            || (self.len() == other.len()
                && self
                    .entries
                    .iter()
                    .zip(other.entries.iter())
                    .all(|(a, b)| a.name == b.name && Arc::ptr_eq(&a.value, &b.value)))
    }

    /// Returns a new tree with the named sub-state replaced.
    ///
    /// Returns `None` if no slice with this name exists.
    pub fn with_slice(&self, name: &str, value: SliceValue) -> Option<StateTree> {
        if !self.contains(name) {
            return None;
        }
        let entries = self.entries.iter().map(|e| {
            if e.name == name {
                (e.name, value.clone())
            } else {
                (e.name, e.value.clone())
            }
        });
        Some(StateTree::from_parts(self.revision + 1, entries))
    }
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("revision", &self.revision)
            .field("slices", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}
