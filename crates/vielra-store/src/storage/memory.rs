//! In-memory storage with failure injection and write probes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::storage::Storage;

/// Process-local [`Storage`]. Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_delay_ms: AtomicUsize,
    writes: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `get` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `set`/`remove` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Holds every write for `delay` before it lands.
    pub fn write_delay(&self, delay: Duration) {
        self.inner
            .write_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// Stores bytes directly, bypassing failure injection.
    pub async fn insert_raw(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.inner.entries.write().await.insert(key.into(), value.into());
    }

    /// Reads bytes directly, bypassing failure injection.
    pub async fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.entries.read().await.get(key).cloned()
    }

    /// Keys currently stored, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of successful `set` calls.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Highest number of writes ever in flight at the same time.
    pub fn max_concurrent_writes(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::read(key, "injected read failure"));
        }
        Ok(self.inner.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.inner.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }

        let result = if self.inner.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::write(key, "injected write failure"))
        } else {
            self.inner
                .entries
                .write()
                .await
                .insert(key.to_string(), value);
            self.inner.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::write(key, "injected write failure"));
        }
        self.inner.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("a").await.unwrap(), None);

        storage.set("a", b"1".to_vec()).await.unwrap();
        assert_eq!(storage.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(storage.write_count(), 1);

        storage.remove("a").await.unwrap();
        storage.remove("a").await.unwrap();
        assert_eq!(storage.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let storage = MemoryStorage::new();
        storage.fail_writes(true);
        assert!(matches!(
            storage.set("a", vec![1]).await,
            Err(StorageError::Write { .. })
        ));
        assert_eq!(storage.write_count(), 0);

        storage.fail_reads(true);
        assert!(matches!(storage.get("a").await, Err(StorageError::Read { .. })));
    }
}
