//! # Effect Orchestrator
//!
//! Supervisor task that watches the store's action stream and runs the
//! effects each action triggers.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Store::listen() ──► ┌──────────────────────┐                          │
//! │                       │     Supervisor       │◄── OrchestratorHandle    │
//! │   done notices ─────► │                      │    cancel / cancel_all   │
//! │                       │  running: key → run  │    in_flight / shutdown  │
//! │                       └──────────┬───────────┘                          │
//! │                                  │ tokio::spawn per run                 │
//! │                                  ▼                                      │
//! │          ┌────────────────────────────────────────────────┐             │
//! │          │ await previous run (Restart)                   │             │
//! │          │ select! { cancelled, deadline(catch_unwind) }  │             │
//! │          │ dispatch follow-ups / on_failure               │             │
//! │          └────────────────────────────────────────────────┘             │
//! │                                                                         │
//! │  SINGLE-FLIGHT (per effect key):                                       │
//! │  ───────────────────────────────                                       │
//! │  Ignore  - a trigger while running is dropped                          │
//! │  Restart - the running instance is cancelled; the new one starts       │
//! │            only after the old task has finished                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use vielra_core::Action;
use vielra_store::Store;

use crate::effect::{CancelSignal, Effect, EffectContext, EffectTable, FlightPolicy};
use crate::error::{EffectError, EffectFailure, EffectResult};

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Deadline for effects that do not declare their own.
    /// Default: None
    pub default_deadline: Option<Duration>,

    /// Time running effects get to stop during shutdown.
    /// Default: 5 seconds
    pub shutdown_grace: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            default_deadline: None,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl OrchestratorConfig {
    pub fn default_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.default_deadline = deadline;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Handle for controlling the orchestrator.
#[derive(Clone)]
pub struct OrchestratorHandle {
    cmd_tx: mpsc::Sender<Command>,
}

#[derive(Debug)]
enum Command {
    Cancel(String, oneshot::Sender<bool>),
    CancelAll(oneshot::Sender<usize>),
    InFlight(oneshot::Sender<Vec<&'static str>>),
    Shutdown(oneshot::Sender<()>),
}

impl OrchestratorHandle {
    /// Cancels the running instance of `key`. Returns true if one was running.
    pub async fn cancel(&self, key: &str) -> EffectResult<bool> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Cancel(key.to_string(), tx)).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Cancels every running effect. Returns how many were running.
    pub async fn cancel_all(&self) -> EffectResult<usize> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::CancelAll(tx)).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Keys of running effects, sorted.
    pub async fn in_flight(&self) -> EffectResult<Vec<&'static str>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::InFlight(tx)).await?;
        rx.await.map_err(|_| stopped())
    }

    /// Cancels everything, waits for running effects and stops the supervisor.
    pub async fn shutdown(&self) -> EffectResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx)).await?;
        rx.await.map_err(|_| stopped())
    }

    async fn send(&self, cmd: Command) -> EffectResult<()> {
        self.cmd_tx.send(cmd).await.map_err(|_| stopped())
    }
}

fn stopped() -> EffectError {
    EffectError::ChannelError("Effect orchestrator stopped".into())
}

// =============================================================================
// Orchestrator
// =============================================================================

pub struct EffectOrchestrator;

impl EffectOrchestrator {
    /// Starts the supervisor.
    ///
    /// Call before the persistence gate opens so that actions replayed at
    /// rehydration reach their effects.
    pub fn spawn<A: Action>(
        store: &Store<A>,
        effects: EffectTable<A>,
        config: OrchestratorConfig,
    ) -> OrchestratorHandle {
        let actions = store.listen();
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        info!(effects = ?effects.keys(), "Effect orchestrator starting");

        let supervisor = Supervisor {
            store: store.clone(),
            effects,
            config,
            running: HashMap::new(),
            stopping: HashMap::new(),
            next_id: 0,
            done_tx,
        };
        tokio::spawn(supervisor.run(actions, cmd_rx, done_rx));

        OrchestratorHandle { cmd_tx }
    }
}

struct Running {
    id: u64,
    signal: CancelSignal,
    handle: JoinHandle<()>,
}

struct Done {
    key: &'static str,
    id: u64,
}

enum Outcome<A> {
    Completed(Vec<A>),
    Failed(EffectFailure),
    Cancelled,
}

struct Supervisor<A: Action> {
    store: Store<A>,
    effects: EffectTable<A>,
    config: OrchestratorConfig,
    running: HashMap<&'static str, Running>,
    /// Cancelled runs that may not have reached an await point yet.
    stopping: HashMap<&'static str, Running>,
    next_id: u64,
    done_tx: mpsc::UnboundedSender<Done>,
}

impl<A: Action> Supervisor<A> {
    async fn run(
        mut self,
        mut actions: mpsc::UnboundedReceiver<A>,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut done_rx: mpsc::UnboundedReceiver<Done>,
    ) {
        loop {
            tokio::select! {
                action = actions.recv() => match action {
                    Some(action) => self.on_action(action),
                    None => {
                        self.stop().await;
                        break;
                    }
                },
                Some(done) = done_rx.recv() => self.on_done(done),
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Cancel(key, reply)) => {
                        let _ = reply.send(self.cancel(&key));
                    }
                    Some(Command::CancelAll(reply)) => {
                        let _ = reply.send(self.cancel_all());
                    }
                    Some(Command::InFlight(reply)) => {
                        let _ = reply.send(self.in_flight());
                    }
                    Some(Command::Shutdown(reply)) => {
                        self.stop().await;
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.stop().await;
                        break;
                    }
                },
            }
        }
        info!("Effect orchestrator stopped");
    }

    fn on_action(&mut self, action: A) {
        let triggered: Vec<Arc<dyn Effect<A>>> = self.effects.matching(&action).cloned().collect();
        for effect in triggered {
            self.start(effect, action.clone());
        }
    }

    fn start(&mut self, effect: Arc<dyn Effect<A>>, trigger: A) {
        let key = effect.key();

        let previous = match self.running.remove(key) {
            Some(run) if !run.handle.is_finished() => match effect.policy() {
                FlightPolicy::Ignore => {
                    debug!(key, kind = trigger.kind(), "Effect in flight - trigger ignored");
                    self.running.insert(key, run);
                    return;
                }
                FlightPolicy::Restart => {
                    debug!(key, kind = trigger.kind(), "Restarting in-flight effect");
                    run.signal.cancel();
                    Some(run.handle)
                }
            },
            _ => self.stopping.remove(key).map(|run| run.handle),
        };

        self.next_id += 1;
        let id = self.next_id;
        let signal = CancelSignal::new();
        let deadline = effect.deadline().or(self.config.default_deadline);
        let ctx = EffectContext::new(self.store.clone(), signal.clone());
        let store = self.store.clone();
        let done_tx = self.done_tx.clone();
        let run_signal = signal.clone();

        debug!(key, id, kind = trigger.kind(), "Effect started");

        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }

            let outcome = execute(effect.as_ref(), trigger.clone(), ctx, &run_signal, deadline).await;
            if run_signal.is_cancelled() {
                debug!(key, id, "Effect cancelled");
            } else {
                deliver(&store, effect.as_ref(), &trigger, outcome);
            }

            let _ = done_tx.send(Done { key, id });
        });

        self.running.insert(key, Running { id, signal, handle });
    }

    fn on_done(&mut self, done: Done) {
        if self.running.get(done.key).is_some_and(|run| run.id == done.id) {
            self.running.remove(done.key);
        }
        if self.stopping.get(done.key).is_some_and(|run| run.id == done.id) {
            self.stopping.remove(done.key);
        }
    }

    fn cancel(&mut self, key: &str) -> bool {
        match self.running.remove_entry(key) {
            Some((key, run)) => {
                run.signal.cancel();
                info!(key, "Effect cancelled by request");
                self.retire(key, run)
            }
            None => false,
        }
    }

    fn cancel_all(&mut self) -> usize {
        let runs: Vec<(&'static str, Running)> = self.running.drain().collect();
        let mut cancelled = 0;
        for (key, run) in runs {
            run.signal.cancel();
            if self.retire(key, run) {
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            info!(cancelled, "All effects cancelled");
        }
        cancelled
    }

    /// Keeps a cancelled run until it stops, so the next run of its key waits
    /// for it. Returns true if it was still running.
    fn retire(&mut self, key: &'static str, run: Running) -> bool {
        if run.handle.is_finished() {
            return false;
        }
        // A run cancelled earlier is awaited by this one already.
        self.stopping.insert(key, run);
        true
    }

    fn in_flight(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = self
            .running
            .iter()
            .filter(|(_, run)| !run.handle.is_finished())
            .map(|(key, _)| *key)
            .collect();
        keys.sort_unstable();
        keys
    }

    async fn stop(&mut self) {
        let runs: Vec<(&'static str, Running)> = self
            .running
            .drain()
            .chain(self.stopping.drain())
            .collect();
        for (_, run) in &runs {
            run.signal.cancel();
        }
        for (key, run) in runs {
            let abort = run.handle.abort_handle();
            if tokio::time::timeout(self.config.shutdown_grace, run.handle).await.is_err() {
                warn!(key, "Effect did not stop within grace period - aborting");
                abort.abort();
            }
        }
    }
}

async fn execute<A: Action>(
    effect: &dyn Effect<A>,
    trigger: A,
    ctx: EffectContext<A>,
    signal: &CancelSignal,
    deadline: Option<Duration>,
) -> Outcome<A> {
    let run = AssertUnwindSafe(effect.run(trigger, ctx)).catch_unwind();

    let guarded = async move {
        let caught = match deadline {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(caught) => caught,
                Err(_) => return Err(EffectFailure::Timeout(limit)),
            },
            None => run.await,
        };
        match caught {
            Ok(result) => result,
            Err(panic) => Err(EffectFailure::Panicked(panic_message(panic.as_ref()))),
        }
    };

    tokio::select! {
        biased;
        _ = signal.cancelled() => Outcome::Cancelled,
        result = guarded => match result {
            Ok(actions) => Outcome::Completed(actions),
            Err(failure) => Outcome::Failed(failure),
        },
    }
}

fn deliver<A: Action>(store: &Store<A>, effect: &dyn Effect<A>, trigger: &A, outcome: Outcome<A>) {
    let key = effect.key();
    match outcome {
        Outcome::Completed(actions) => {
            debug!(key, follow_ups = actions.len(), "Effect completed");
            for action in actions {
                dispatch(store, key, action);
            }
        }
        Outcome::Failed(failure) => {
            match &failure {
                EffectFailure::Panicked(message) => error!(key, panic = %message, "Effect panicked"),
                other => warn!(key, error = %other, retryable = other.is_retryable(), "Effect failed"),
            }
            dispatch(store, key, effect.on_failure(trigger, failure));
        }
        Outcome::Cancelled => debug!(key, "Effect cancelled"),
    }
}

fn dispatch<A: Action>(store: &Store<A>, key: &'static str, action: A) {
    let kind = action.kind();
    if let Err(e) = store.dispatch(action) {
        warn!(key, kind, error = %e, "Effect follow-up rejected");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
