//! Token store — durable single-slot storage for the session token.
//!
//! Exactly one token is held at a time. Its presence is the only signal that
//! the user is logged in.

mod file;
mod memory;

pub use file::{FileTokenStore, default_data_dir};
pub use memory::MemoryTokenStore;

use async_trait::async_trait;
use thiserror::Error;

/// Fixed key the token is stored under.
pub const TOKEN_KEY: &str = "userToken";

/// Storage errors. Fatal for the operation that hit them; never retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Token storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Process-wide storage for one named token string.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Overwrite whatever is stored with `token`.
    async fn save(&self, token: &str) -> Result<(), StoreError>;

    /// Return the stored token, or `None` when nothing is stored.
    async fn read(&self) -> Result<Option<String>, StoreError>;

    /// Remove the stored token. Clearing an empty slot is a no-op.
    async fn clear(&self) -> Result<(), StoreError>;
}
