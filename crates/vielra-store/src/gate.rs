//! # Persistence Gate
//!
//! Rehydrates persisted slices before the store accepts dispatches, then
//! keeps durable storage converging towards the in-memory tree.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  UNINITIALIZED ──open()──► REHYDRATING ──all reads done──► READY        │
//! │                                 │                            ▲          │
//! │                                 │ storage read failed        │          │
//! │                                 ▼                            │          │
//! │                              FAILED ───── defaults ──────────┘          │
//! │                                                                         │
//! │  Per-slice corruption does not fail the gate: that slice alone is      │
//! │  reset to its defaults and reported.                                   │
//! │                                                                         │
//! │  While not READY, dispatches are buffered by the store and replayed    │
//! │  in order on the transition to READY.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write-Back
//! ```text
//! tree watch ──► observe() ──► dirty {app, auth}
//!                                 │  (debounce window, default 250ms)
//!                                 ▼
//!                              flush() ──► storage.set(key, envelope)
//!                                          one write at a time, in one task
//!                                 │
//!                       write failed? ──► retry in 1s, 2s, 4s ... 30s
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use vielra_core::{Action, SliceValue, StateTree};

use crate::error::{StorageError, StorageResult, StoreError, StoreResult};
use crate::snapshot::{decode_slice, encode_state, slice_key, SnapshotEnvelope};
use crate::storage::SharedStorage;
use crate::store::Store;

// =============================================================================
// Constants
// =============================================================================

/// Default storage key prefix.
pub const DEFAULT_ROOT_KEY: &str = "vielra";

/// Default write-back debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// First retry delay after a failed write; doubles per consecutive failure.
const RETRY_BASE: Duration = Duration::from_secs(1);

/// Upper bound on the retry delay.
const RETRY_MAX: Duration = Duration::from_secs(30);

// =============================================================================
// Gate Phase
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatePhase {
    Uninitialized,
    Rehydrating,
    Ready,
    Failed,
}

impl fmt::Display for GatePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatePhase::Uninitialized => write!(f, "uninitialized"),
            GatePhase::Rehydrating => write!(f, "rehydrating"),
            GatePhase::Ready => write!(f, "ready"),
            GatePhase::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Prefix of every slice key.
    /// Default: "vielra"
    pub root_key: String,

    /// Window between the first unsaved change and the write.
    /// Default: 250ms
    pub debounce: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            root_key: DEFAULT_ROOT_KEY.to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl GateConfig {
    pub fn root_key(mut self, root_key: impl Into<String>) -> Self {
        self.root_key = root_key.into();
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

// =============================================================================
// Rehydration Report
// =============================================================================

/// What rehydration did for each persistable slice.
#[derive(Debug, Clone, Default)]
pub struct RehydrationReport {
    /// Slices restored from storage.
    pub restored: Vec<String>,

    /// Slices with nothing stored yet.
    pub missing: Vec<String>,

    /// Slices whose stored value was unreadable and were reset to defaults.
    pub reset: Vec<(String, StorageError)>,

    /// Storage itself could not be read; every slice started from defaults.
    pub failure: Option<StorageError>,

    /// Actions dispatched during rehydration and replayed afterwards.
    pub replayed: usize,
}

impl RehydrationReport {
    /// Returns true if nothing had to be discarded.
    pub fn is_clean(&self) -> bool {
        self.reset.is_empty() && self.failure.is_none()
    }
}

// =============================================================================
// Gate
// =============================================================================

/// Entry point that opens a store's persistence.
pub struct PersistenceGate;

impl PersistenceGate {
    /// Rehydrates `store` from `storage`, marks it ready and starts write-back.
    ///
    /// Storage faults never fail this call; they end up in the report and
    /// the affected slices start from their defaults.
    ///
    /// ## Errors
    /// `AlreadyOpened` if the store is past `Uninitialized`.
    pub async fn open<A: Action>(
        store: &Store<A>,
        storage: SharedStorage,
        config: GateConfig,
    ) -> StoreResult<(GateHandle, RehydrationReport)> {
        store.begin_rehydration()?;
        info!(root_key = %config.root_key, "Rehydrating persisted state");

        let (tree, mut report) = rehydrate(store, &storage, &config.root_key).await;

        if let Some(err) = &report.failure {
            store.mark_failed();
            error!(error = %err, "Storage unreadable - starting from defaults");
        }

        store.install(tree.clone());
        let tree_rx = store.subscribe();
        report.replayed = store.mark_ready();

        info!(
            restored = report.restored.len(),
            missing = report.missing.len(),
            reset = report.reset.len(),
            replayed = report.replayed,
            "Persistence gate ready"
        );

        let reset: Vec<String> = report.reset.iter().map(|(name, _)| name.clone()).collect();
        let writer = WriteBack::new(store.clone(), storage, config, &tree, &report.restored, &reset);
        let handle = writer.start(tree_rx);

        Ok((handle, report))
    }
}

async fn rehydrate<A: Action>(
    store: &Store<A>,
    storage: &SharedStorage,
    root_key: &str,
) -> (StateTree, RehydrationReport) {
    let reducer = store.reducer();
    let mut report = RehydrationReport::default();
    let mut restored: HashMap<&'static str, SliceValue> = HashMap::new();

    for slice in reducer.slices().filter(|s| s.persistence().is_enabled()) {
        let name = slice.name();
        let key = slice_key(root_key, name);

        match storage.get(&key).await {
            Ok(None) => {
                debug!(slice = name, "Nothing persisted yet");
                report.missing.push(name.to_string());
            }
            Ok(Some(bytes)) => match decode_slice(slice, &key, &bytes) {
                Ok(value) => {
                    debug!(slice = name, bytes = bytes.len(), "Slice restored");
                    restored.insert(name, value);
                    report.restored.push(name.to_string());
                }
                Err(e) => {
                    warn!(slice = name, error = %e, "Persisted slice unreadable - using defaults");
                    report.reset.push((name.to_string(), e));
                }
            },
            Err(e) => {
                report.failure = Some(e);
                break;
            }
        }
    }

    if report.failure.is_some() {
        restored.clear();
        report.restored.clear();
    }

    let tree = reducer.assemble(0, |name| restored.remove(name));
    (tree, report)
}

// =============================================================================
// Gate Handle
// =============================================================================

/// Handle for controlling the write-back task.
#[derive(Clone)]
pub struct GateHandle {
    cmd_tx: mpsc::Sender<GateCommand>,
}

#[derive(Debug)]
enum GateCommand {
    Flush(oneshot::Sender<usize>),
    Purge(oneshot::Sender<StorageResult<()>>),
    Shutdown(oneshot::Sender<()>),
}

impl GateHandle {
    /// Writes every unsaved change now. Returns the number of slices written.
    pub async fn flush(&self) -> StoreResult<usize> {
        let (tx, rx) = oneshot::channel();
        self.send(GateCommand::Flush(tx)).await?;
        rx.await.map_err(|_| closed())
    }

    /// Removes every persisted slice from storage.
    pub async fn purge(&self) -> StoreResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(GateCommand::Purge(tx)).await?;
        rx.await.map_err(|_| closed())?.map_err(StoreError::from)
    }

    /// Flushes and stops the write-back task.
    pub async fn shutdown(&self) -> StoreResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(GateCommand::Shutdown(tx)).await?;
        rx.await.map_err(|_| closed())
    }

    async fn send(&self, cmd: GateCommand) -> StoreResult<()> {
        self.cmd_tx.send(cmd).await.map_err(|_| closed())
    }
}

fn closed() -> StoreError {
    StoreError::ChannelError("Persistence write-back stopped".into())
}

// =============================================================================
// Write-Back Task
// =============================================================================

struct WriteBack<A: Action> {
    store: Store<A>,
    storage: SharedStorage,
    config: GateConfig,
    /// Last observed sub-state per persistable slice.
    seen: HashMap<&'static str, SliceValue>,
    /// Last persisted JSON per slice.
    written: HashMap<&'static str, Value>,
    dirty: BTreeSet<&'static str>,
    /// Consecutive flushes that left slices unwritten.
    failures: u32,
}

impl<A: Action> WriteBack<A> {
    fn new(
        store: Store<A>,
        storage: SharedStorage,
        config: GateConfig,
        installed: &StateTree,
        restored: &[String],
        reset: &[String],
    ) -> Self {
        let mut seen = HashMap::new();
        let mut written = HashMap::new();
        let mut dirty = BTreeSet::new();

        for slice in store.reducer().slices().filter(|s| s.persistence().is_enabled()) {
            let name = slice.name();
            let Some(value) = installed.raw(name) else {
                continue;
            };
            seen.insert(name, value.clone());

            if restored.iter().any(|r| r == name) {
                if let Ok(Some(state)) = slice.encode(value) {
                    written.insert(name, state);
                }
            }
            // Overwrite unreadable data with the defaults now in memory.
            if reset.iter().any(|r| r == name) {
                dirty.insert(name);
            }
        }

        WriteBack {
            store,
            storage,
            config,
            seen,
            written,
            dirty,
            failures: 0,
        }
    }

    fn start(self, tree_rx: watch::Receiver<StateTree>) -> GateHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);

        tokio::spawn(async move {
            self.run(tree_rx, cmd_rx).await;
        });

        GateHandle { cmd_tx }
    }

    async fn run(
        mut self,
        mut tree_rx: watch::Receiver<StateTree>,
        mut cmd_rx: mpsc::Receiver<GateCommand>,
    ) {
        info!(
            root_key = %self.config.root_key,
            debounce_ms = self.config.debounce.as_millis() as u64,
            "Persistence write-back started"
        );

        // Catch up with anything replayed between install and start.
        let current = tree_rx.borrow_and_update().clone();
        self.observe(&current);

        let mut deadline = (!self.dirty.is_empty()).then(|| Instant::now() + self.config.debounce);

        loop {
            tokio::select! {
                changed = tree_rx.changed() => {
                    if changed.is_err() {
                        self.flush().await;
                        break;
                    }
                    let tree = tree_rx.borrow_and_update().clone();
                    if self.observe(&tree) && deadline.is_none() {
                        deadline = Some(Instant::now() + self.config.debounce);
                    }
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush().await;
                    deadline = self.retry_deadline();
                }
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(GateCommand::Flush(reply)) => {
                            deadline = None;
                            self.observe(&self.store.state());
                            let written = self.flush().await;
                            deadline = self.retry_deadline();
                            let _ = reply.send(written);
                        }
                        Some(GateCommand::Purge(reply)) => {
                            deadline = None;
                            let result = self.purge().await;
                            let _ = reply.send(result);
                        }
                        Some(GateCommand::Shutdown(reply)) => {
                            info!("Persistence write-back shutting down");
                            self.observe(&self.store.state());
                            self.flush().await;
                            let _ = reply.send(());
                            break;
                        }
                        None => {
                            self.flush().await;
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Next attempt for slices a flush left dirty, backing off per failure.
    fn retry_deadline(&mut self) -> Option<Instant> {
        if self.dirty.is_empty() {
            self.failures = 0;
            return None;
        }
        let delay = RETRY_BASE
            .saturating_mul(1 << self.failures.min(5))
            .min(RETRY_MAX);
        self.failures += 1;
        warn!(
            pending = self.dirty.len(),
            retry_in_ms = delay.as_millis() as u64,
            "Write-back incomplete - scheduling retry"
        );
        Some(Instant::now() + delay)
    }

    /// Marks persistable slices whose sub-state changed. Returns true if any did.
    fn observe(&mut self, tree: &StateTree) -> bool {
        let mut changed = false;
        for slice in self.store.reducer().slices().filter(|s| s.persistence().is_enabled()) {
            let name = slice.name();
            let Some(value) = tree.raw(name) else {
                continue;
            };
            let same = self
                .seen
                .get(name)
                .is_some_and(|prev| Arc::ptr_eq(prev, value));
            if !same {
                self.seen.insert(name, value.clone());
                self.dirty.insert(name);
                changed = true;
            }
        }
        changed
    }

    /// Writes dirty slices one after another. Returns the number written.
    async fn flush(&mut self) -> usize {
        if self.dirty.is_empty() {
            return 0;
        }

        let tree = self.store.state();
        let names: Vec<&'static str> = self.dirty.iter().copied().collect();
        let mut written = 0;

        for name in names {
            let key = slice_key(&self.config.root_key, name);
            let (Some(slice), Some(value)) = (self.store.reducer().slice(name), tree.raw(name)) else {
                self.dirty.remove(name);
                continue;
            };

            let state = match encode_state(slice, value, &key) {
                Ok(Some(state)) => state,
                Ok(None) => {
                    self.dirty.remove(name);
                    continue;
                }
                Err(e) => {
                    error!(slice = name, error = %e, "Slice could not be encoded - skipping");
                    self.dirty.remove(name);
                    continue;
                }
            };

            // Only non-persisted fields changed.
            if self.written.get(name) == Some(&state) {
                self.dirty.remove(name);
                continue;
            }

            let bytes = match SnapshotEnvelope::new(slice.version(), state.clone()).to_bytes(&key) {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(slice = name, error = %e, "Snapshot could not be serialized - skipping");
                    self.dirty.remove(name);
                    continue;
                }
            };

            match self.storage.set(&key, bytes).await {
                Ok(()) => {
                    debug!(slice = name, key = %key, "Slice persisted");
                    self.written.insert(name, state);
                    self.dirty.remove(name);
                    written += 1;
                }
                Err(e) => {
                    warn!(slice = name, error = %e, "Write-back failed - will retry");
                }
            }
        }

        written
    }

    async fn purge(&mut self) -> StorageResult<()> {
        let mut result = Ok(());
        let names: Vec<&'static str> = self
            .store
            .reducer()
            .slices()
            .filter(|s| s.persistence().is_enabled())
            .map(|s| s.name())
            .collect();

        for name in names {
            let key = slice_key(&self.config.root_key, name);
            if let Err(e) = self.storage.remove(&key).await {
                warn!(slice = name, error = %e, "Failed to purge persisted slice");
                result = Err(e);
            }
        }

        self.written.clear();
        self.dirty.clear();
        info!("Persisted state purged");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, Storage};
    use crate::store::StoreConfig;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use vielra_core::i18n::LanguageCode;
    use vielra_core::modules::app::{AppSliceAction, AppState};
    use vielra_core::modules::auth::{AuthAction, AuthSession, AuthState, AvailabilityStatus, User};
    use vielra_core::modules::phrasebook::PhrasebookState;
    use vielra_core::root::{app_registry, selectors, AppAction};
    use vielra_core::theme::PaletteMode;
    use vielra_core::{Persistence, Slice, SliceRegistry};

    fn app_store() -> Store<AppAction> {
        Store::new(app_registry().unwrap().compose(), StoreConfig::default())
    }

    async fn open(store: &Store<AppAction>, storage: &MemoryStorage) -> (GateHandle, RehydrationReport) {
        PersistenceGate::open(store, Arc::new(storage.clone()), GateConfig::default())
            .await
            .unwrap()
    }

    fn session() -> AuthSession {
        AuthSession {
            token: "secret-token".into(),
            user: User {
                name: "Ana".into(),
                username: "ana".into(),
                email: "ana@example.com".into(),
                availability: AvailabilityStatus::Away,
            },
        }
    }

    #[tokio::test]
    async fn test_round_trip_restores_persistable_fields() {
        let storage = MemoryStorage::new();
        let store = app_store();
        let (gate, report) = open(&store, &storage).await;
        assert_eq!(report.missing, vec!["app", "auth", "phrasebook"]);

        store.dispatch(AppSliceAction::SetLanguage(LanguageCode::Vi)).unwrap();
        store.dispatch(AppSliceAction::SetPaletteMode(PaletteMode::Dark)).unwrap();
        store.dispatch(AppSliceAction::SetSplashScreenVisible(false)).unwrap();
        store.dispatch(AuthAction::LoginSucceeded(session())).unwrap();
        gate.flush().await.unwrap();

        let fresh = app_store();
        let (_gate, report) = open(&fresh, &storage).await;
        assert!(report.is_clean());
        assert_eq!(report.restored, vec!["app", "auth"]);
        assert_eq!(report.missing, vec!["phrasebook"]);

        let tree = fresh.state();
        let app = tree.get::<AppState>("app").unwrap();
        assert_eq!(app.language, LanguageCode::Vi);
        assert_eq!(app.palette_mode, PaletteMode::Dark);
        // Not persistable: back to default.
        assert!(app.splash_screen_visible);

        let auth = tree.get::<AuthState>("auth").unwrap();
        assert!(auth.is_authenticated);
        assert_eq!(auth.user.as_ref().unwrap().username, "ana");
        assert_eq!(auth.token, None);
    }

    #[tokio::test]
    async fn test_corrupt_slice_resets_only_that_slice() {
        let storage = MemoryStorage::new();
        storage.insert_raw("vielra:app", b"{not json".to_vec()).await;
        storage
            .insert_raw(
                "vielra:auth",
                serde_json::to_vec(&json!({
                    "format": 1,
                    "version": 1,
                    "state": { "is_authenticated": true, "user": null }
                }))
                .unwrap(),
            )
            .await;

        let store = app_store();
        let (gate, report) = open(&store, &storage).await;

        assert_eq!(store.phase(), GatePhase::Ready);
        assert_eq!(report.reset.len(), 1);
        assert_eq!(report.reset[0].0, "app");
        assert!(report.reset[0].1.is_per_key());
        assert!(selectors::is_authenticated(&store.state()));
        assert_eq!(selectors::palette_mode(&store.state()), PaletteMode::Light);

        // The unreadable entry is replaced with the defaults.
        gate.flush().await.unwrap();
        let raw = storage.raw("vielra:app").await.unwrap();
        assert!(SnapshotEnvelope::from_bytes("vielra:app", &raw).is_ok());
    }

    #[tokio::test]
    async fn test_incompatible_version_resets_slice() {
        let storage = MemoryStorage::new();
        storage
            .insert_raw(
                "vielra:app",
                serde_json::to_vec(&json!({
                    "format": 1,
                    "version": 99,
                    "state": { "language": "vi" }
                }))
                .unwrap(),
            )
            .await;

        let store = app_store();
        let (_gate, report) = open(&store, &storage).await;
        assert_eq!(report.reset.len(), 1);
        assert_eq!(selectors::current_language(&store.state()), LanguageCode::En);
    }

    #[tokio::test]
    async fn test_unreadable_storage_still_reaches_ready() {
        let storage = MemoryStorage::new();
        storage.fail_reads(true);

        let store = app_store();
        let mut phases = store.phase_watch();
        let (_gate, report) = open(&store, &storage).await;

        assert!(report.failure.is_some());
        assert!(report.restored.is_empty());
        assert_eq!(store.phase(), GatePhase::Ready);
        assert_eq!(*phases.borrow_and_update(), GatePhase::Ready);
        assert_eq!(store.state().get::<PhrasebookState>("phrasebook"), Some(&PhrasebookState::default()));
    }

    #[tokio::test]
    async fn test_dispatch_during_rehydration_is_replayed_and_persisted() {
        let storage = MemoryStorage::new();
        let store = app_store();

        store.dispatch(AppSliceAction::SetLanguage(LanguageCode::Id)).unwrap();
        let (gate, report) = open(&store, &storage).await;

        assert_eq!(report.replayed, 1);
        assert_eq!(selectors::current_language(&store.state()), LanguageCode::Id);

        assert_eq!(gate.flush().await.unwrap(), 1);
        assert!(storage.raw("vielra:app").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_changes() {
        let storage = MemoryStorage::new();
        let store = app_store();
        let (_gate, _) = open(&store, &storage).await;

        for _ in 0..9 {
            store.dispatch(AppSliceAction::TogglePaletteMode).unwrap();
        }
        assert_eq!(storage.write_count(), 0);

        tokio::time::sleep(Duration::from_millis(DEFAULT_DEBOUNCE_MS + 50)).await;

        assert_eq!(storage.write_count(), 1);
        let raw = storage.raw("vielra:app").await.unwrap();
        let envelope = SnapshotEnvelope::from_bytes("vielra:app", &raw).unwrap();
        assert_eq!(envelope.state["palette_mode"], json!("dark"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_changes_are_not_written() {
        let storage = MemoryStorage::new();
        let store = app_store();
        let (gate, _) = open(&store, &storage).await;

        store.dispatch(AppSliceAction::SetAlreadyLaunched(true)).unwrap();
        gate.flush().await.unwrap();
        assert_eq!(storage.write_count(), 1);

        // Only a non-persisted field changes.
        store.dispatch(AppSliceAction::SetBottomTabVisible(false)).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_never_overlap() {
        let storage = MemoryStorage::new();
        storage.write_delay(Duration::from_millis(40));
        let store = app_store();
        let (gate, _) = open(&store, &storage).await;

        for round in 0..5 {
            store.dispatch(AppSliceAction::TogglePaletteMode).unwrap();
            store.dispatch(AuthAction::LoginSucceeded(session())).unwrap();
            store.dispatch(AuthAction::Reset).unwrap();
            store.dispatch(AppSliceAction::SetAlreadyLaunched(round % 2 == 0)).unwrap();
            tokio::time::sleep(Duration::from_millis(130)).await;
        }
        gate.flush().await.unwrap();

        assert!(storage.write_count() >= 2);
        assert_eq!(storage.max_concurrent_writes(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_is_retried() {
        let storage = MemoryStorage::new();
        let store = app_store();
        let (gate, _) = open(&store, &storage).await;

        storage.fail_writes(true);
        store.dispatch(AppSliceAction::SetLanguage(LanguageCode::Vi)).unwrap();
        assert_eq!(gate.flush().await.unwrap(), 0);

        storage.fail_writes(false);
        assert_eq!(gate.flush().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_retries_on_its_own() {
        let storage = MemoryStorage::new();
        let store = app_store();
        let (_gate, _) = open(&store, &storage).await;

        storage.fail_writes(true);
        store.dispatch(AppSliceAction::SetLanguage(LanguageCode::Vi)).unwrap();
        tokio::time::sleep(Duration::from_millis(DEFAULT_DEBOUNCE_MS + 50)).await;
        assert!(storage.raw("vielra:app").await.is_none());

        // Storage recovers; no further dispatch happens.
        storage.fail_writes(false);
        tokio::time::sleep(RETRY_MAX + Duration::from_secs(1)).await;

        let raw = storage.raw("vielra:app").await.unwrap();
        let envelope = SnapshotEnvelope::from_bytes("vielra:app", &raw).unwrap();
        assert_eq!(envelope.state["language"], json!("vi"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_back_off_while_storage_keeps_failing() {
        let storage = MemoryStorage::new();
        let store = app_store();
        let (_gate, _) = open(&store, &storage).await;

        storage.fail_writes(true);
        store.dispatch(AppSliceAction::SetLanguage(LanguageCode::Vi)).unwrap();
        // Debounce, then retries after 1s, 2s and 4s.
        tokio::time::sleep(Duration::from_millis(DEFAULT_DEBOUNCE_MS) + Duration::from_millis(7_100)).await;
        assert!(storage.raw("vielra:app").await.is_none());

        // Next attempt is 8s after the last one.
        storage.fail_writes(false);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(storage.raw("vielra:app").await.is_none());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(storage.raw("vielra:app").await.is_some());
    }

    #[tokio::test]
    async fn test_purge_and_shutdown() {
        let storage = MemoryStorage::new();
        let store = app_store();
        let (gate, _) = open(&store, &storage).await;

        store.dispatch(AppSliceAction::SetLanguage(LanguageCode::Vi)).unwrap();
        gate.flush().await.unwrap();
        assert_eq!(storage.keys().await, vec!["vielra:app"]);

        gate.purge().await.unwrap();
        assert!(storage.keys().await.is_empty());

        store.dispatch(AppSliceAction::SetLanguage(LanguageCode::Id)).unwrap();
        gate.shutdown().await.unwrap();
        assert_eq!(storage.keys().await, vec!["vielra:app"]);
        assert!(gate.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_open_twice_is_rejected() {
        let storage = MemoryStorage::new();
        let store = app_store();
        let _opened = open(&store, &storage).await;
        let again = PersistenceGate::open(&store, Arc::new(storage.clone()), GateConfig::default()).await;
        assert!(matches!(again, Err(StoreError::AlreadyOpened)));
    }

    // -------------------------------------------------------------------------
    // Two-slice scenario: {auth: {token}, settings: {locale}}
    // -------------------------------------------------------------------------

    #[derive(Debug, Clone)]
    enum ScenarioAction {
        SetToken(String),
    }

    impl Action for ScenarioAction {
        fn kind(&self) -> &'static str {
            "auth/setToken"
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TokenState {
        token: Option<String>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct LocaleState {
        locale: String,
    }

    struct TokenSlice;
    struct LocaleSlice;

    impl Slice<ScenarioAction> for TokenSlice {
        const NAME: &'static str = "auth";
        type State = TokenState;

        fn initial_state(&self) -> TokenState {
            TokenState { token: None }
        }

        fn reduce(&self, _state: &TokenState, action: &ScenarioAction) -> Option<TokenState> {
            let ScenarioAction::SetToken(token) = action;
            Some(TokenState {
                token: Some(token.clone()),
            })
        }

        fn persistence(&self) -> Persistence {
            Persistence::All
        }
    }

    impl Slice<ScenarioAction> for LocaleSlice {
        const NAME: &'static str = "settings";
        type State = LocaleState;

        fn initial_state(&self) -> LocaleState {
            LocaleState {
                locale: "en".into(),
            }
        }

        fn reduce(&self, _state: &LocaleState, _action: &ScenarioAction) -> Option<LocaleState> {
            None
        }

        fn persistence(&self) -> Persistence {
            Persistence::All
        }
    }

    fn scenario_store() -> Store<ScenarioAction> {
        let reducer = SliceRegistry::new()
            .with(TokenSlice)
            .unwrap()
            .with(LocaleSlice)
            .unwrap()
            .compose();
        Store::new(reducer, StoreConfig::default())
    }

    #[tokio::test]
    async fn test_set_token_survives_restart() {
        let storage: SharedStorage = Arc::new(MemoryStorage::new());

        let store = scenario_store();
        let (gate, _) = PersistenceGate::open(&store, storage.clone(), GateConfig::default())
            .await
            .unwrap();
        store.dispatch(ScenarioAction::SetToken("abc".into())).unwrap();

        let expected = json!({ "auth": { "token": "abc" }, "settings": { "locale": "en" } });
        assert_eq!(store.reducer().to_json(&store.state()).unwrap(), expected);
        gate.shutdown().await.unwrap();
        assert!(storage.get("vielra:auth").await.unwrap().is_some());

        let fresh = scenario_store();
        let (_gate, report) = PersistenceGate::open(&fresh, storage, GateConfig::default())
            .await
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(fresh.reducer().to_json(&fresh.state()).unwrap(), expected);
        assert!(fresh
            .reducer()
            .trees_equal(&fresh.state(), &store.state()));
    }
}
