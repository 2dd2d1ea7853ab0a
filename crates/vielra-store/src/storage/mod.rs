//! # Durable Storage
//!
//! The key/value collaborator used by the persistence gate and by ad hoc
//! values such as the access token.
//!
//! ```text
//! ┌──────────────────────┐
//! │   dyn Storage        │  get(key) -> Option<bytes>
//! │                      │  set(key, bytes)
//! │                      │  remove(key)
//! └──────────┬───────────┘
//!            │
//!     ┌──────┴──────────┐
//!     ▼                 ▼
//! SqliteStorage     MemoryStorage
//! (kv_store table)  (tests, ephemeral runs)
//! ```
//!
//! Every failure is returned as a [`StorageError`](crate::StorageError);
//! implementations never panic.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageResult;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStorage;
pub use sqlite::{SqliteStorage, StorageConfig};

/// Asynchronous key/value storage.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads a value; `Ok(None)` if the key is absent.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Removes a key. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Shared storage handle.
pub type SharedStorage = Arc<dyn Storage>;

#[async_trait]
impl<S: Storage + ?Sized> Storage for Arc<S> {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key).await
    }
}
