//! Token validator — local liveness check for JWT access tokens.
//!
//! Only the payload segment is decoded; the signature is never checked. The
//! result drives the UI (stay logged in or not), it is not a security
//! boundary.

use base64::Engine;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// URL-safe base64 that accepts payloads with or without `=` padding.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Why a token could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token has no expiry claim")]
    MissingExpiry,
}

/// Claims read from an (unverified) token payload.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    /// Expiry instant in milliseconds since the epoch (`exp` × 1000).
    pub expires_at_ms: i64,
    /// Standard `sub` claim, if present.
    pub subject: Option<String>,
    /// `email` claim, if present.
    pub email: Option<String>,
    /// Every claim in the payload.
    pub raw: Map<String, Value>,
}

impl TokenClaims {
    /// Expiry as a UTC timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.expires_at_ms).single()
    }

    /// Whether the token is still usable at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() < self.expires_at_ms
    }

    /// [`Self::is_live_at`] against the wall clock.
    pub fn is_live(&self) -> bool {
        self.is_live_at(Utc::now())
    }
}

/// Decode the payload segment of `token` and read its claims.
pub fn decode_claims(token: &str) -> Result<TokenClaims, TokenError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_header), Some(payload)) if !payload.is_empty() => payload,
        _ => return Err(TokenError::Malformed("missing payload segment".into())),
    };

    let bytes = PAYLOAD_ENGINE
        .decode(payload)
        .map_err(|e| TokenError::Malformed(format!("base64: {e}")))?;
    let raw: Map<String, Value> = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("payload json: {e}")))?;

    let exp = raw
        .get("exp")
        .and_then(expiry_seconds)
        .ok_or(TokenError::MissingExpiry)?;

    let subject = raw.get("sub").and_then(Value::as_str).map(str::to_string);
    let email = raw.get("email").and_then(Value::as_str).map(str::to_string);

    Ok(TokenClaims {
        expires_at_ms: (exp * 1000.0) as i64,
        subject,
        email,
        raw,
    })
}

/// `exp` is normally a number of seconds; numeric strings are accepted too.
fn expiry_seconds(value: &Value) -> Option<f64> {
    let seconds = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    seconds.filter(|v: &f64| v.is_finite())
}

/// Whether `token` is present, decodable, and not yet expired at `now`.
///
/// Malformed and expired tokens both yield `false`; use [`decode_claims`]
/// to tell them apart.
pub fn is_live_at(token: Option<&str>, now: DateTime<Utc>) -> bool {
    match token {
        Some(t) if !t.is_empty() => decode_claims(t)
            .map(|claims| claims.is_live_at(now))
            .unwrap_or(false),
        _ => false,
    }
}

/// [`is_live_at`] against the wall clock.
pub fn is_live(token: Option<&str>) -> bool {
    is_live_at(token, Utc::now())
}

/// Expiry of `token`, if it decodes.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    decode_claims(token).ok().and_then(|c| c.expires_at())
}
