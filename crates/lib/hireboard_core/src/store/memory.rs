//! In-memory token store for tests and embedded shells.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{StoreError, TokenStore};

/// Keeps the token in process memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn save(&self, token: &str) -> Result<(), StoreError> {
        *self.slot.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn read(&self) -> Result<Option<String>, StoreError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.slot.lock().await.take();
        Ok(())
    }
}
