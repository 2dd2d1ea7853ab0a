//! # Effect Contract
//!
//! An effect is an asynchronous operation started by a dispatched action.
//! It never touches state directly: it reads the tree through its context
//! and returns follow-up actions.
//!
//! ```text
//! trigger action ──► Effect::run(trigger, ctx) ──┬── Ok(actions)  ──► dispatch each
//!                                               ├── Err(failure) ──► dispatch on_failure()
//!                                               └── cancelled    ──► nothing
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use vielra_core::{Action, ConfigurationError, StateTree};
use vielra_store::{Dispatched, Store, StoreResult};

use crate::error::EffectFailure;

// =============================================================================
// Flight Policy
// =============================================================================

/// What a new trigger does while the same effect is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightPolicy {
    /// Drop the new trigger.
    #[default]
    Ignore,

    /// Cancel the running instance, then start the new one once it stopped.
    Restart,
}

// =============================================================================
// Cancel Signal
// =============================================================================

/// Cooperative cancellation flag shared by one run and its supervisor.
///
/// Once raised it stays raised; clones observe the same flag.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        CancelSignal { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on cancel.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

// =============================================================================
// Effect
// =============================================================================

#[async_trait]
pub trait Effect<A: Action>: Send + Sync + 'static {
    /// Single-flight key. Unique within an [`EffectTable`].
    fn key(&self) -> &'static str;

    /// Returns true if `action` starts this effect.
    fn triggers(&self, action: &A) -> bool;

    fn policy(&self) -> FlightPolicy {
        FlightPolicy::Ignore
    }

    /// Upper bound on one run. `None` defers to the orchestrator default.
    fn deadline(&self) -> Option<Duration> {
        None
    }

    /// Performs the work and returns follow-up actions.
    async fn run(&self, trigger: A, ctx: EffectContext<A>) -> Result<Vec<A>, EffectFailure>;

    /// Action dispatched when a run fails, times out or panics.
    fn on_failure(&self, trigger: &A, failure: EffectFailure) -> A;
}

// =============================================================================
// Context
// =============================================================================

/// What a running effect may see and do.
pub struct EffectContext<A: Action> {
    store: Store<A>,
    cancel: CancelSignal,
}

impl<A: Action> Clone for EffectContext<A> {
    fn clone(&self) -> Self {
        EffectContext {
            store: self.store.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<A: Action> EffectContext<A> {
    pub fn new(store: Store<A>, cancel: CancelSignal) -> Self {
        EffectContext { store, cancel }
    }

    /// Current tree.
    pub fn state(&self) -> StateTree {
        self.store.state()
    }

    pub fn select<R>(&self, selector: impl FnOnce(&StateTree) -> R) -> R {
        self.store.select(selector)
    }

    /// Dispatches an intermediate action while the effect keeps running.
    pub fn dispatch(&self, action: impl Into<A>) -> StoreResult<Dispatched> {
        self.store.dispatch(action)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once this run is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

// =============================================================================
// Effect Table
// =============================================================================

/// Registered effects, keyed uniquely.
pub struct EffectTable<A: Action> {
    effects: Vec<Arc<dyn Effect<A>>>,
}

impl<A: Action> Default for EffectTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> EffectTable<A> {
    pub fn new() -> Self {
        EffectTable {
            effects: Vec::new(),
        }
    }

    /// Registers an effect.
    ///
    /// ## Errors
    /// `DuplicateEffect` if the key is taken.
    pub fn register<E: Effect<A>>(&mut self, effect: E) -> Result<&mut Self, ConfigurationError> {
        let key = effect.key();
        if self.contains(key) {
            return Err(ConfigurationError::DuplicateEffect(key.to_string()));
        }
        self.effects.push(Arc::new(effect));
        Ok(self)
    }

    pub fn with<E: Effect<A>>(mut self, effect: E) -> Result<Self, ConfigurationError> {
        self.register(effect)?;
        Ok(self)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.effects.iter().any(|e| e.key() == key)
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.effects.iter().map(|e| e.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Effects started by `action`, in registration order.
    pub fn matching<'a>(&'a self, action: &'a A) -> impl Iterator<Item = &'a Arc<dyn Effect<A>>> + 'a {
        self.effects.iter().filter(move |e| e.triggers(action))
    }
}
