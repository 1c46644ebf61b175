//! # hireboard_core
//!
//! Session gate for the Hireboard job-board client.
//!
//! The gate keeps a single bearer token in a [`store::TokenStore`], checks its
//! expiry locally ([`token`]), attaches it to every backend call and turns a
//! `401` into a forced logout ([`gateway`]), and picks one home route per
//! role after login ([`roles`]). [`session::SessionController`] ties these
//! together into the `Unauthenticated → Checking → Authenticated(role)` state
//! machine that a UI shell subscribes to.
//!
//! The token check is advisory. Signatures are never verified here; the
//! backend enforces authorization.

pub mod config;
pub mod endpoints;
pub mod gateway;
pub mod roles;
pub mod session;
pub mod store;
pub mod token;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
