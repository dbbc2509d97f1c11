//! Identity provider — sign-up/sign-in contract and error mapping.
//!
//! DESIGN
//! ======
//! `IdentityProvider` is the seam the effect pipeline talks to; the reqwest
//! implementation lives in `identity_toolkit` and tests plug in stubs.
//! Provider failures are never surfaced raw: `user_message` maps them onto a
//! fixed table of user-facing strings.

pub mod identity_toolkit;

use serde::{Deserialize, Deserializer};

use crate::intent::Credentials;

pub use identity_toolkit::IdentityToolkitClient;

pub const MSG_EMAIL_EXISTS: &str = "This email exists already.";
pub const MSG_EMAIL_NOT_FOUND: &str = "This email does not exist.";
pub const MSG_INVALID_PASSWORD: &str = "This password is not correct.";
pub const MSG_UNKNOWN: &str = "An unknown error occurred";

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("identity provider request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status. `body` is the decoded
    /// JSON body, `Null` when it was not JSON.
    #[error("identity provider rejected request: status {status}")]
    Rejected { status: u16, body: serde_json::Value },

    /// A success response did not match the expected shape.
    #[error("identity provider response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ProviderError {
    /// Provider-defined error code found at `error.message` in a rejection body.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { body, .. } => body.get("error")?.get("message")?.as_str(),
            _ => None,
        }
    }
}

/// Fixed user-facing message for a provider failure.
#[must_use]
pub fn user_message(err: &ProviderError) -> &'static str {
    match err.code() {
        Some("EMAIL_EXISTS") => MSG_EMAIL_EXISTS,
        Some("EMAIL_NOT_FOUND") => MSG_EMAIL_NOT_FOUND,
        Some("INVALID_PASSWORD") => MSG_INVALID_PASSWORD,
        _ => MSG_UNKNOWN,
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Success body of both the sign-up and sign-in endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub kind: Option<String>,
    pub id_token: String,
    pub email: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds.
    #[serde(deserialize_with = "seconds_from_string_or_number")]
    pub expires_in: u64,
    pub local_id: String,
    #[serde(default)]
    pub registered: Option<bool>,
}

fn seconds_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Async identity provider. Enables stubbing in tests.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and return a fresh token.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the request fails or is rejected.
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthResponse, ProviderError>;

    /// Authenticate an existing account.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] if the request fails or is rejected.
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthResponse, ProviderError>;
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
