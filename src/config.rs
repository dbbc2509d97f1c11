//! Configuration parsed from environment variables.

use std::path::PathBuf;

use crate::services::persistence::DEFAULT_SESSION_KEY;

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_SESSION_DIR: &str = ".authflow";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeouts: ProviderTimeouts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub provider: ProviderConfig,
    pub session_dir: PathBuf,
    pub session_key: String,
}

impl AuthConfig {
    /// Build typed config from the process environment.
    ///
    /// Required:
    /// - `AUTH_API_KEY`
    ///
    /// Optional:
    /// - `AUTH_PROVIDER_BASE_URL`: default Identity Toolkit v1 URL
    /// - `AUTH_SESSION_DIR`: default `.authflow`
    /// - `AUTH_SESSION_KEY`: default `userData`
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if `AUTH_API_KEY` is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AuthConfig::from_env`] with an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if `AUTH_API_KEY` is unset or empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("AUTH_API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingApiKey { var: "AUTH_API_KEY" })?;
        let base_url = lookup("AUTH_PROVIDER_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = ProviderTimeouts {
            request_secs: parse_u64(&lookup, "AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(&lookup, "AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let session_dir = lookup("AUTH_SESSION_DIR").map_or_else(|| PathBuf::from(DEFAULT_SESSION_DIR), PathBuf::from);
        let session_key = lookup("AUTH_SESSION_KEY").unwrap_or_else(|| DEFAULT_SESSION_KEY.to_string());

        Ok(Self { provider: ProviderConfig { api_key, base_url, timeouts }, session_dir, session_key })
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key).and_then(|v| v.parse::<u64>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
