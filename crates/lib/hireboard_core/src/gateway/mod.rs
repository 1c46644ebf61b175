//! Authenticated request gateway.
//!
//! Every backend call goes through [`ApiClient`]. It attaches the stored
//! bearer token, and a `401` from any endpoint ends the session: the token
//! is cleared and, when the caller passed a [`Navigator`], the navigation
//! stack is reset to the login screen.

mod navigation;

pub use navigation::{LOGIN_ROUTE, Navigator, Route};

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::GateConfig;
use crate::store::{StoreError, TokenStore};

/// Gateway errors.
///
/// A `401` or a non-2xx status is not an error at this level; see
/// [`ApiOutcome`]. [`ApiOutcome::into_result`] converts those into
/// `Unauthorized` / `Status` for callers that treat them as failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Session ended by the server")]
    Unauthorized,

    #[error("Request failed with HTTP {0}")]
    Status(StatusCode),
}

/// Result of one gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    /// 2xx with a JSON payload.
    Json(Value),
    /// 2xx with no payload (e.g. `204`).
    Empty,
    /// `401`. The token has been cleared and navigation reset. No result.
    Unauthorized,
    /// Any other non-2xx status. No result.
    Failed(StatusCode),
}

impl ApiOutcome {
    /// True for the two outcomes that carry no result.
    pub fn is_no_result(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Failed(_))
    }

    /// Payload of a successful call. Empty success and no result both map to `None`.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Treat "no result" as an error; keep empty success distinct from payload.
    pub fn into_result(self) -> Result<Option<Value>, GatewayError> {
        match self {
            Self::Json(v) => Ok(Some(v)),
            Self::Empty => Ok(None),
            Self::Unauthorized => Err(GatewayError::Unauthorized),
            Self::Failed(status) => Err(GatewayError::Status(status)),
        }
    }
}

/// HTTP client bound to one backend and one token store.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    store: Arc<dyn TokenStore>,
    timeout: Option<Duration>,
}

impl ApiClient {
    /// Create a client for `base_url`. A trailing `/` is added if missing so
    /// relative paths land under it.
    pub fn new(base_url: &str, store: Arc<dyn TokenStore>) -> Result<Self, GatewayError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized)
            .map_err(|e| GatewayError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            store,
            timeout: None,
        })
    }

    /// Create a client from configuration.
    pub fn from_config(config: &GateConfig, store: Arc<dyn TokenStore>) -> Result<Self, GatewayError> {
        Ok(Self::new(&config.api_url, store)?.with_timeout(config.request_timeout))
    }

    /// Set a per-request timeout. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The token store this client reads credentials from.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL for a path relative to the base.
    pub fn url_for(&self, path: &str) -> Result<Url, GatewayError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| GatewayError::InvalidUrl(format!("{path}: {e}")))
    }

    pub async fn get(
        &self,
        path: &str,
        navigator: Option<&dyn Navigator>,
    ) -> Result<ApiOutcome, GatewayError> {
        self.send::<Value>(Method::GET, path, None, navigator).await
    }

    pub async fn post<B>(
        &self,
        path: &str,
        body: Option<&B>,
        navigator: Option<&dyn Navigator>,
    ) -> Result<ApiOutcome, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send(Method::POST, path, body, navigator).await
    }

    pub async fn put<B>(
        &self,
        path: &str,
        body: Option<&B>,
        navigator: Option<&dyn Navigator>,
    ) -> Result<ApiOutcome, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send(Method::PUT, path, body, navigator).await
    }

    pub async fn patch<B>(
        &self,
        path: &str,
        body: Option<&B>,
        navigator: Option<&dyn Navigator>,
    ) -> Result<ApiOutcome, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send(Method::PATCH, path, body, navigator).await
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        navigator: Option<&dyn Navigator>,
    ) -> Result<ApiOutcome, GatewayError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let url = self.url_for(path)?;
        let token = self.store.read().await?;

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = token.as_deref() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        debug!(%method, path, authenticated = token.is_some(), "api request");

        let response = request.send().await.map_err(|e| {
            warn!(%method, path, "api request failed: {e}");
            GatewayError::Transport(e)
        })?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.force_logout(navigator).await?;
            return Ok(ApiOutcome::Unauthorized);
        }

        if !status.is_success() {
            warn!(%method, path, status = status.as_u16(), "api request rejected");
            return Ok(ApiOutcome::Failed(status));
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ApiOutcome::Empty);
        }
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(%method, path, "api response is not JSON: {e}");
            GatewayError::Decode(e)
        })?;
        Ok(ApiOutcome::Json(value))
    }

    /// Clear the token and reset navigation. The redirect is attempted even
    /// if clearing fails; the storage error is reported afterwards.
    async fn force_logout(&self, navigator: Option<&dyn Navigator>) -> Result<(), GatewayError> {
        info!("server rejected credentials, ending session");
        let cleared = self.store.clear().await;
        if let Some(navigator) = navigator {
            navigator.reset(vec![Route::login()]);
        }
        cleared.map_err(GatewayError::from)
    }
}
