//! Redirect capability handed to the gateway by the calling screen.

use serde::{Deserialize, Serialize};

/// Name of the unauthenticated entry screen.
pub const LOGIN_ROUTE: &str = "Login";

/// One entry of a navigation stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
}

impl Route {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The unauthenticated entry screen.
    pub fn login() -> Self {
        Self::new(LOGIN_ROUTE)
    }
}

/// Something that can replace the whole navigation stack.
///
/// Implemented by the UI shell. The gateway only ever resets to
/// `[Route::login()]`.
pub trait Navigator: Send + Sync {
    fn reset(&self, routes: Vec<Route>);
}
