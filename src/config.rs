//! Client configuration.
//!
//! Values come from the environment, after loading a `.env` file if one is
//! present. API base URL: `RECIPEBOX_API_URL` > `EXPO_PUBLIC_API_URL` >
//! localhost default.

use std::time::Duration;

use crate::api::credentials::{CREDENTIAL_KEY, DEFAULT_SERVICE_NAME};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base of every API path, usually ending in `/api`.
    pub base_url: String,
    pub keyring_service: String,
    pub credential_key: String,
    /// Transport-level ceilings. Expiry surfaces as a network error.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            keyring_service: DEFAULT_SERVICE_NAME.to_string(),
            credential_key: CREDENTIAL_KEY.to_string(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("RECIPEBOX_API_URL")
            .or_else(|| non_empty("EXPO_PUBLIC_API_URL"))
            .unwrap_or(defaults.base_url);
        let keyring_service = non_empty("RECIPEBOX_KEYRING_SERVICE").unwrap_or(defaults.keyring_service);
        let request_timeout = non_empty("RECIPEBOX_REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        Self {
            base_url: base_url.trim().to_string(),
            keyring_service,
            credential_key: defaults.credential_key,
            request_timeout,
            connect_timeout: defaults.connect_timeout,
        }
    }
}
