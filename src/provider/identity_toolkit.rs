//! Identity Toolkit REST client.
//!
//! Thin HTTP wrapper over `accounts:signUp` and `accounts:signInWithPassword`.
//! Both take `{ email, password, returnSecureToken: true }` and the API key as
//! the `key` query parameter. Pure parsing in `parse_response` for testability.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::{AuthResponse, IdentityProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::intent::{AuthMode, Credentials};

// =============================================================================
// CLIENT
// =============================================================================

pub struct IdentityToolkitClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl IdentityToolkitClient {
    /// Build a client from typed provider config.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ProviderError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key: config.api_key.clone(), base_url: config.base_url.clone() })
    }

    fn endpoint(&self, mode: AuthMode) -> String {
        let method = match mode {
            AuthMode::SignUp => "signUp",
            AuthMode::SignIn => "signInWithPassword",
        };
        format!("{}/accounts:{method}", self.base_url)
    }

    async fn submit(&self, mode: AuthMode, credentials: &Credentials) -> Result<AuthResponse, ProviderError> {
        let body = SubmitRequest {
            email: &credentials.email,
            password: &credentials.password,
            return_secure_token: true,
        };

        // `without_url` keeps the API key out of error strings and logs.
        let response = self
            .http
            .post(self.endpoint(mode))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.without_url().to_string()))?;

        debug!(?mode, status, "identity_toolkit: response received");
        parse_response(status, &text)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for IdentityToolkitClient {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthResponse, ProviderError> {
        self.submit(AuthMode::SignUp, credentials).await
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthResponse, ProviderError> {
        self.submit(AuthMode::SignIn, credentials).await
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_response(status: u16, text: &str) -> Result<AuthResponse, ProviderError> {
    if !(200..300).contains(&status) {
        let body = serde_json::from_str(text).unwrap_or(serde_json::Value::Null);
        return Err(ProviderError::Rejected { status, body });
    }
    serde_json::from_str(text).map_err(|e| ProviderError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "identity_toolkit_test.rs"]
mod tests;
