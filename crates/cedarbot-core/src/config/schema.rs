//! Configuration schema.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Endpoint used when neither the config file nor the environment sets one.
pub const DEFAULT_ENDPOINT: &str = "https://chatbot.collectco.com/cedarbot/api/";

/// Request timeout used when none is configured, or when it is set to 0.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.cedarbot/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub transport: TransportConfig,
}

// ─────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────

/// Settings for the HTTP chat transport.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportConfig {
    /// URL of the question-answering endpoint.
    pub endpoint: String,
    /// Whole-request timeout in seconds; expiry is reported as a network error.
    /// `0` means [`DEFAULT_TIMEOUT_SECS`].
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl TransportConfig {
    /// The request timeout to apply, with `0` mapped to the default.
    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }
}
