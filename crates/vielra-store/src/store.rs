//! # Store Handle
//!
//! The single owner of the live [`StateTree`]. Passed explicitly to whatever
//! needs it; cloning the handle is cheap and shares the same store.
//!
//! ## Dispatch Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  dispatch(action)                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────── lock ───────────────────────────────────────────┐    │
//! │  │ phase != Ready ──► buffer (bounded) ──► Buffered / Rejected    │    │
//! │  │ phase == Ready ──► RootReducer::reduce ──► new tree            │    │
//! │  │                     │                                          │    │
//! │  │                     ├──► watch: latest tree (subscribers)      │    │
//! │  │                     └──► mpsc: action, in order (listeners)    │    │
//! │  └────────────────────────────────────────────────────────────────┘    │
//! │                                                                         │
//! │  mark_ready() replays buffered actions in dispatch order under the     │
//! │  same lock, so nothing dispatched later can overtake them.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use vielra_core::{Action, RootReducer, StateTree};

use crate::error::{StoreError, StoreResult};
use crate::gate::GatePhase;

/// Default bound of the early-dispatch buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Actions held while rehydration runs. Further dispatches are rejected.
    /// Default: 256
    pub buffer_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl StoreConfig {
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}

/// Outcome of a successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Reducer ran; the tree now has this revision.
    Applied { revision: u64 },

    /// Held until rehydration completes; `pending` actions are waiting.
    Buffered { pending: usize },
}

// =============================================================================
// Store
// =============================================================================

/// Handle to a running store.
pub struct Store<A: Action> {
    inner: Arc<StoreInner<A>>,
}

impl<A: Action> Clone for Store<A> {
    fn clone(&self) -> Self {
        Store {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct StoreInner<A: Action> {
    reducer: RootReducer<A>,
    config: StoreConfig,
    core: Mutex<StoreCore<A>>,
    tree_tx: watch::Sender<StateTree>,
    phase_tx: watch::Sender<GatePhase>,
}

struct StoreCore<A> {
    tree: StateTree,
    phase: GatePhase,
    pending: VecDeque<A>,
    listeners: Vec<mpsc::UnboundedSender<A>>,
}

impl<A: Action> Store<A> {
    /// Creates a store waiting for its persistence gate.
    ///
    /// Dispatches are buffered until the gate reports `Ready`.
    pub fn new(reducer: RootReducer<A>, config: StoreConfig) -> Self {
        let tree = reducer.initial_tree();
        let (tree_tx, _) = watch::channel(tree.clone());
        let (phase_tx, _) = watch::channel(GatePhase::Uninitialized);

        info!(
            slices = ?reducer.names(),
            buffer_capacity = config.buffer_capacity,
            "Store created"
        );

        Store {
            inner: Arc::new(StoreInner {
                reducer,
                config,
                core: Mutex::new(StoreCore {
                    tree,
                    phase: GatePhase::Uninitialized,
                    pending: VecDeque::new(),
                    listeners: Vec::new(),
                }),
                tree_tx,
                phase_tx,
            }),
        }
    }

    /// Creates a store without persistence, ready immediately.
    pub fn ephemeral(reducer: RootReducer<A>) -> Self {
        let store = Self::new(reducer, StoreConfig::default());
        store.mark_ready();
        store
    }

    fn lock(&self) -> MutexGuard<'_, StoreCore<A>> {
        // Reducers are pure; a poisoned lock still guards a consistent tree.
        self.inner.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatches an action.
    ///
    /// ## Errors
    /// `DispatchRejected` if rehydration is still running and the buffer is full.
    pub fn dispatch(&self, action: impl Into<A>) -> StoreResult<Dispatched> {
        let action = action.into();
        let mut core = self.lock();

        if core.phase != GatePhase::Ready {
            let capacity = self.inner.config.buffer_capacity;
            if core.pending.len() >= capacity {
                warn!(
                    kind = action.kind(),
                    capacity,
                    phase = %core.phase,
                    "Early dispatch rejected"
                );
                return Err(StoreError::DispatchRejected {
                    kind: action.kind(),
                    capacity,
                });
            }
            debug!(kind = action.kind(), phase = %core.phase, "Dispatch buffered");
            core.pending.push_back(action);
            return Ok(Dispatched::Buffered {
                pending: core.pending.len(),
            });
        }

        let revision = self.apply(&mut core, action);
        Ok(Dispatched::Applied { revision })
    }

    fn apply(&self, core: &mut StoreCore<A>, action: A) -> u64 {
        let next = self.inner.reducer.reduce(&core.tree, &action);
        let revision = next.revision();
        trace!(kind = action.kind(), revision, "Action applied");

        core.tree = next.clone();
        self.inner.tree_tx.send_replace(next);
        core.listeners.retain(|tx| tx.send(action.clone()).is_ok());
        revision
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    /// Current tree.
    pub fn state(&self) -> StateTree {
        self.lock().tree.clone()
    }

    /// Runs a selector against a snapshot of the current tree.
    ///
    /// The lock is released first, so a selector may dispatch.
    pub fn select<R>(&self, selector: impl FnOnce(&StateTree) -> R) -> R {
        let tree = self.state();
        selector(&tree)
    }

    /// Receiver that always holds the latest tree.
    pub fn subscribe(&self) -> watch::Receiver<StateTree> {
        self.inner.tree_tx.subscribe()
    }

    /// Stream of every applied action, in application order.
    pub fn listen(&self) -> mpsc::UnboundedReceiver<A> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().listeners.push(tx);
        rx
    }

    pub fn phase(&self) -> GatePhase {
        self.lock().phase
    }

    pub fn phase_watch(&self) -> watch::Receiver<GatePhase> {
        self.inner.phase_tx.subscribe()
    }

    /// Resolves once the store accepts dispatches directly.
    pub async fn wait_until_ready(&self) {
        let mut rx = self.phase_watch();
        // Sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|phase| *phase == GatePhase::Ready).await;
    }

    /// Number of buffered actions.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn reducer(&self) -> &RootReducer<A> {
        &self.inner.reducer
    }

    // =========================================================================
    // Lifecycle (driven by the persistence gate)
    // =========================================================================

    pub(crate) fn begin_rehydration(&self) -> StoreResult<()> {
        let mut core = self.lock();
        if core.phase != GatePhase::Uninitialized {
            return Err(StoreError::AlreadyOpened);
        }
        self.set_phase(&mut core, GatePhase::Rehydrating);
        Ok(())
    }

    pub(crate) fn mark_failed(&self) {
        let mut core = self.lock();
        self.set_phase(&mut core, GatePhase::Failed);
    }

    /// Replaces the tree with the rehydrated one.
    pub(crate) fn install(&self, tree: StateTree) {
        let mut core = self.lock();
        core.tree = tree.clone();
        self.inner.tree_tx.send_replace(tree);
    }

    /// Opens the store for direct dispatch and replays the buffer.
    ///
    /// Returns the number of replayed actions.
    pub(crate) fn mark_ready(&self) -> usize {
        let mut core = self.lock();
        self.set_phase(&mut core, GatePhase::Ready);

        let pending: Vec<A> = core.pending.drain(..).collect();
        let replayed = pending.len();
        for action in pending {
            self.apply(&mut core, action);
        }
        if replayed > 0 {
            info!(replayed, "Replayed actions dispatched during rehydration");
        }
        replayed
    }

    fn set_phase(&self, core: &mut StoreCore<A>, phase: GatePhase) {
        debug!(from = %core.phase, to = %phase, "Store phase changed");
        core.phase = phase;
        self.inner.phase_tx.send_replace(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vielra_core::i18n::LanguageCode;
    use vielra_core::modules::app::AppSliceAction;
    use vielra_core::modules::settings::SettingsAction;
    use vielra_core::root::{app_registry, selectors, AppAction};

    fn store(config: StoreConfig) -> Store<AppAction> {
        Store::new(app_registry().unwrap().compose(), config)
    }

    #[test]
    fn test_ephemeral_store_applies_immediately() {
        let store = Store::ephemeral(app_registry().unwrap().compose());
        assert_eq!(store.phase(), GatePhase::Ready);

        let result = store
            .dispatch(AppSliceAction::SetLanguage(LanguageCode::Id))
            .unwrap();
        assert_eq!(result, Dispatched::Applied { revision: 1 });
        assert_eq!(store.select(selectors::current_language), LanguageCode::Id);
    }

    #[test]
    fn test_selector_may_dispatch() {
        let store = Store::ephemeral(app_registry().unwrap().compose());

        let before = store.select(|tree| {
            let language = selectors::current_language(tree);
            store.dispatch(AppSliceAction::SetLanguage(LanguageCode::Vi)).unwrap();
            language
        });

        assert_eq!(before, LanguageCode::En);
        assert_eq!(store.select(selectors::current_language), LanguageCode::Vi);
    }

    #[tokio::test]
    async fn test_listeners_see_actions_in_order() {
        let store = Store::ephemeral(app_registry().unwrap().compose());
        let mut rx = store.listen();

        store.dispatch(AppSliceAction::TogglePaletteMode).unwrap();
        store.dispatch(SettingsAction::SetLanguageSheetOpen(true)).unwrap();
        store.dispatch(AppSliceAction::SetAlreadyLaunched(true)).unwrap();

        let kinds: Vec<_> = [
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
            rx.recv().await.unwrap(),
        ]
        .iter()
        .map(|a| a.kind())
        .collect();
        assert_eq!(
            kinds,
            vec![
                "app/togglePaletteMode",
                "settings/setLanguageSheetOpen",
                "app/setAlreadyLaunched"
            ]
        );
    }

    #[test]
    fn test_early_dispatch_is_buffered_then_replayed() {
        let store = store(StoreConfig::default());
        store.begin_rehydration().unwrap();

        let result = store.dispatch(AppSliceAction::TogglePaletteMode).unwrap();
        assert_eq!(result, Dispatched::Buffered { pending: 1 });
        assert_eq!(store.state().revision(), 0);

        assert_eq!(store.mark_ready(), 1);
        assert!(selectors::is_dark_mode(&store.state()));
        assert_eq!(store.pending_len(), 0);
    }

    #[test]
    fn test_replay_happens_after_installed_state() {
        let store = store(StoreConfig::default());
        store.begin_rehydration().unwrap();
        store.dispatch(AppSliceAction::TogglePaletteMode).unwrap();

        // Rehydrated tree already has dark mode; the buffered toggle applies on top.
        let reducer = store.reducer().clone();
        let dark = reducer.reduce(
            &reducer.initial_tree(),
            &AppAction::App(AppSliceAction::TogglePaletteMode),
        );
        store.install(dark);
        store.mark_ready();

        assert!(!selectors::is_dark_mode(&store.state()));
    }

    #[test]
    fn test_buffer_overflow_is_rejected() {
        let store = store(StoreConfig::default().buffer_capacity(2));
        store.dispatch(AppSliceAction::TogglePaletteMode).unwrap();
        store.dispatch(AppSliceAction::TogglePaletteMode).unwrap();

        let err = store
            .dispatch(AppSliceAction::TogglePaletteMode)
            .unwrap_err();
        assert!(matches!(err, StoreError::DispatchRejected { capacity: 2, .. }));
        assert_eq!(store.pending_len(), 2);
    }

    #[test]
    fn test_gate_cannot_open_twice() {
        let store = store(StoreConfig::default());
        store.begin_rehydration().unwrap();
        assert!(matches!(
            store.begin_rehydration(),
            Err(StoreError::AlreadyOpened)
        ));
    }

    #[tokio::test]
    async fn test_subscribers_see_latest_tree() {
        let store = Store::ephemeral(app_registry().unwrap().compose());
        let mut rx = store.subscribe();

        store.dispatch(AppSliceAction::TogglePaletteMode).unwrap();
        rx.changed().await.unwrap();
        assert!(selectors::is_dark_mode(&rx.borrow_and_update()));
    }
}
