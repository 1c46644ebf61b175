//! Session gate configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::store::{TOKEN_KEY, default_data_dir};

/// Backend used when `HIREBOARD_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api/";

/// Configuration for the gateway and token store.
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// Base URL every relative API path is joined onto.
    pub api_url: String,
    /// Directory holding the persisted token.
    pub data_dir: PathBuf,
    /// Name of the token slot inside `data_dir`.
    pub token_key: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            data_dir: default_data_dir(),
            token_key: TOKEN_KEY.into(),
            request_timeout: None,
        }
    }
}

impl GateConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                  | Default                         |
    /// |---------------------------|---------------------------------|
    /// | `HIREBOARD_API_URL`       | `http://localhost:5000/api/`    |
    /// | `HIREBOARD_DATA_DIR`      | `<platform data dir>/hireboard` |
    /// | `HIREBOARD_TIMEOUT_SECS`  | none                            |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_url: std::env::var("HIREBOARD_API_URL").unwrap_or(defaults.api_url),
            data_dir: std::env::var("HIREBOARD_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            token_key: defaults.token_key,
            request_timeout: std::env::var("HIREBOARD_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }
}
