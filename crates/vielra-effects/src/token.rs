//! Access token persistence.
//!
//! The token lives outside the persisted `auth` slice, under its own storage
//! key. Storage failures are logged and absorbed: a missing token only means
//! the user signs in again.

use tracing::{debug, warn};

use vielra_store::SharedStorage;

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

#[derive(Clone)]
pub struct TokenStore {
    storage: SharedStorage,
    key: String,
}

impl TokenStore {
    pub fn new(storage: SharedStorage) -> Self {
        TokenStore {
            storage,
            key: ACCESS_TOKEN_KEY.to_string(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub async fn load(&self) -> Option<String> {
        match self.storage.get(&self.key).await {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(token) if !token.is_empty() => Some(token),
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "Stored access token is not UTF-8 - ignoring");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read access token");
                None
            }
        }
    }

    pub async fn save(&self, token: &str) {
        match self.storage.set(&self.key, token.as_bytes().to_vec()).await {
            Ok(()) => debug!("Access token saved"),
            Err(e) => warn!(error = %e, "Failed to save access token"),
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.storage.remove(&self.key).await {
            warn!(error = %e, "Failed to clear access token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vielra_store::MemoryStorage;

    #[tokio::test]
    async fn test_save_load_clear() {
        let storage = MemoryStorage::new();
        let tokens = TokenStore::new(Arc::new(storage.clone()));

        assert_eq!(tokens.load().await, None);
        tokens.save("abc").await;
        assert_eq!(tokens.load().await.as_deref(), Some("abc"));
        assert_eq!(storage.raw(ACCESS_TOKEN_KEY).await, Some(b"abc".to_vec()));

        tokens.clear().await;
        assert_eq!(tokens.load().await, None);
    }

    #[tokio::test]
    async fn test_failures_are_absorbed() {
        let storage = MemoryStorage::new();
        storage.insert_raw(ACCESS_TOKEN_KEY, b"abc".to_vec()).await;
        storage.fail_reads(true);
        storage.fail_writes(true);

        let tokens = TokenStore::new(Arc::new(storage.clone()));
        assert_eq!(tokens.load().await, None);
        tokens.save("new").await;
        tokens.clear().await;
        assert_eq!(storage.raw(ACCESS_TOKEN_KEY).await, Some(b"abc".to_vec()));
    }
}
