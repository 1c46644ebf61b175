//! Session controller — the `Unauthenticated → Checking → Authenticated(role)`
//! state machine.
//!
//! The controller owns the current [`SessionState`] and publishes every
//! transition on a `watch` channel that the UI subscribes to. It also
//! implements [`Navigator`], so passing it to a gateway call turns a `401`
//! into a transition back to `Unauthenticated`.
//!
//! Each login, logout and forced logout starts a new generation. A role
//! lookup that finishes under an older generation is discarded instead of
//! overwriting the newer state.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::endpoints;
use crate::gateway::{ApiClient, ApiOutcome, GatewayError, LOGIN_ROUTE, Navigator, Route};
use crate::roles::{Role, fetch_role};
use crate::store::StoreError;
use crate::token;

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Checking,
    Authenticated(Role),
}

impl SessionState {
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Authenticated(role) => Some(*role),
            _ => None,
        }
    }

    /// Screen to show for this state. `None` while checking.
    pub fn home_route(&self) -> Option<Route> {
        match self {
            Self::Unauthenticated => Some(Route::login()),
            Self::Checking => None,
            Self::Authenticated(role) => Some(role.home_route()),
        }
    }
}

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Could not determine the user's role")]
    RoleUnavailable,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: Option<String>,
    message: Option<String>,
}

/// Owns the session state for one app instance.
pub struct SessionController {
    client: ApiClient,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
}

impl SessionController {
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::Unauthenticated);
        Self {
            client,
            state,
            generation: AtomicU64::new(0),
        }
    }

    /// Gateway bound to this session's token store.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Current session generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn transition(&self, next: SessionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(?prev, ?next, "session transition");
        }
    }

    /// App start: restore the session from the stored token, if any.
    ///
    /// An expired or malformed token is cleared without touching the network.
    pub async fn boot(&self) -> Result<SessionState, SessionError> {
        let generation = self.generation();
        let Some(stored) = self.client.store().read().await? else {
            self.transition(SessionState::Unauthenticated);
            return Ok(SessionState::Unauthenticated);
        };

        self.transition(SessionState::Checking);
        if !token::is_live(Some(&stored)) {
            info!("stored token is no longer live, clearing it");
            self.client.store().clear().await?;
            self.transition(SessionState::Unauthenticated);
            return Ok(SessionState::Unauthenticated);
        }

        self.resolve(generation).await
    }

    /// Exchange credentials for a token and resolve the user's role.
    ///
    /// A failed login ends logged out with an empty store, whatever the
    /// session looked like before.
    pub async fn login(&self, email: &str, password: &str) -> Result<Role, SessionError> {
        let generation = self.next_generation();
        let result = self.attempt_login(generation, email, password).await;

        if result.is_err() && self.generation() == generation {
            if let Err(e) = self.client.store().clear().await {
                warn!(error = %e, "could not clear token after failed login");
            }
            self.transition(SessionState::Unauthenticated);
        }
        result
    }

    async fn attempt_login(
        &self,
        generation: u64,
        email: &str,
        password: &str,
    ) -> Result<Role, SessionError> {
        let request = LoginRequest { email, password };

        let outcome = self
            .client
            .post(endpoints::CREATE_TOKEN, Some(&request), None)
            .await?;
        let body = match outcome {
            ApiOutcome::Json(body) => body,
            ApiOutcome::Empty => {
                return Err(SessionError::LoginRejected("empty response".into()));
            }
            ApiOutcome::Unauthorized => {
                return Err(SessionError::LoginRejected("invalid credentials".into()));
            }
            ApiOutcome::Failed(status) => {
                return Err(SessionError::LoginRejected(format!("HTTP {status}")));
            }
        };

        let response: LoginResponse = serde_json::from_value(body).map_err(GatewayError::from)?;
        let access_token = match response.access_token {
            Some(t) if !t.is_empty() => t,
            _ => {
                let message = response
                    .message
                    .unwrap_or_else(|| "no access token in response".into());
                warn!(%message, "login rejected");
                return Err(SessionError::LoginRejected(message));
            }
        };

        self.client.store().save(&access_token).await?;
        info!("login succeeded, token stored");

        match self.resolve(generation).await? {
            SessionState::Authenticated(role) => Ok(role),
            _ => Err(SessionError::RoleUnavailable),
        }
    }

    /// Explicit logout. Safe to call when already logged out.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.next_generation();
        let cleared = self.client.store().clear().await;
        self.transition(SessionState::Unauthenticated);
        info!("logged out");
        cleared.map_err(SessionError::from)
    }

    /// Re-validate the stored token, e.g. when a screen gains focus.
    ///
    /// Returns `false` and ends the session if the token is missing, malformed
    /// or expired.
    pub async fn check(&self) -> Result<bool, SessionError> {
        let stored = self.client.store().read().await?;
        if token::is_live(stored.as_deref()) {
            return Ok(true);
        }
        if stored.is_some() {
            info!("token expired, ending session");
            self.client.store().clear().await?;
        }
        self.next_generation();
        self.transition(SessionState::Unauthenticated);
        Ok(false)
    }

    async fn resolve(&self, generation: u64) -> Result<SessionState, SessionError> {
        self.transition(SessionState::Checking);
        let fetched = fetch_role(&self.client).await;

        if self.generation() != generation {
            debug!(
                started = generation,
                current = self.generation(),
                "discarding stale role lookup"
            );
            return Ok(self.state());
        }

        match fetched {
            Ok(Some(role)) => {
                let next = SessionState::Authenticated(role);
                self.transition(next);
                info!(%role, "session established");
                Ok(next)
            }
            Ok(None) => {
                self.transition(SessionState::Unauthenticated);
                Ok(SessionState::Unauthenticated)
            }
            Err(e) => {
                self.transition(SessionState::Unauthenticated);
                Err(e.into())
            }
        }
    }
}

impl Navigator for SessionController {
    fn reset(&self, routes: Vec<Route>) {
        if routes.first().is_some_and(|r| r.name == LOGIN_ROUTE) {
            self.next_generation();
            self.transition(SessionState::Unauthenticated);
        }
    }
}
