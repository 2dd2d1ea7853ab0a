//! # vielra-store: Store Runtime & Persistence for Vielra
//!
//! Runs the root reducer from `vielra-core` behind a cloneable [`Store`]
//! handle and keeps persisted slices in durable storage.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vielra State Flow                                │
//! │                                                                         │
//! │  screen / effect ── dispatch(action) ──┐                                │
//! │                                        ▼                                │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 vielra-store (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │    Store      │    │ Persistence   │    │   Storage    │  │   │
//! │  │   │  (store.rs)   │───►│     Gate      │───►│  (storage/)  │  │   │
//! │  │   │               │    │  (gate.rs)    │    │              │  │   │
//! │  │   │ RootReducer   │    │ rehydrate     │    │ SqliteStorage│  │   │
//! │  │   │ watch + mpsc  │    │ write-back    │    │ MemoryStorage│  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                        │                                │
//! │                                        ▼                                │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <data dir>/vielra.db  (kv_store: "vielra:<slice>" → envelope) │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - Store handle: dispatch, subscriptions, early-dispatch buffer
//! - [`gate`] - Rehydration and debounced write-back
//! - [`storage`] - Key/value storage trait, SQLite and in-memory backends
//! - [`snapshot`] - Persisted envelope format
//! - [`migrations`] - Embedded SQLite migrations
//! - [`error`] - Storage and store error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vielra_store::{GateConfig, PersistenceGate, SqliteStorage, StorageConfig, Store, StoreConfig};
//!
//! let storage = SqliteStorage::open(StorageConfig::new("vielra.db")).await?;
//! let store = Store::new(app_registry()?.compose(), StoreConfig::default());
//! let (gate, report) = PersistenceGate::open(&store, Arc::new(storage), GateConfig::default()).await?;
//!
//! store.dispatch(AppSliceAction::TogglePaletteMode)?;
//! gate.shutdown().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod gate;
pub mod migrations;
pub mod snapshot;
pub mod storage;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StorageError, StorageResult, StoreError, StoreResult};
pub use gate::{GateConfig, GateHandle, GatePhase, PersistenceGate, RehydrationReport};
pub use storage::{MemoryStorage, SharedStorage, SqliteStorage, Storage, StorageConfig};
pub use store::{Dispatched, Store, StoreConfig};
