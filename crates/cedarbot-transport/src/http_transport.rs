//! HTTP transport for the question-answering endpoint.
//!
//! Each turn is a single POST with a form-encoded body:
//!
//! ```text
//! question=<message>&session_id=<session>&user_id=<user>
//! ```
//!
//! A 2xx response must carry a JSON body with a non-empty `answer` string.
//! Anything else is classified into a [`TransportError`]. No retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, warn};

use cedarbot_core::config::TransportConfig;
use cedarbot_core::error::TransportError;
use cedarbot_core::utils::truncate_string;

use crate::traits::ChatTransport;

/// Longest response body kept in a protocol error's `detail`.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Success body returned by the endpoint. `session_id` and `user_id` are
/// echoed back too but not needed.
#[derive(Debug, Deserialize)]
struct AnswerBody {
    #[serde(default)]
    answer: Option<String>,
}

// ─────────────────────────────────────────────
// HttpTransport
// ─────────────────────────────────────────────

/// Talks to the chat endpoint over HTTP via `reqwest`.
pub struct HttpTransport {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// Full endpoint URL (e.g. `"https://chatbot.collectco.com/cedarbot/api/"`).
    endpoint: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport from the loaded transport config.
    ///
    /// A `timeoutSecs` of 0 falls back to the default timeout.
    pub fn new(config: &TransportConfig) -> reqwest::Result<Self> {
        if config.timeout_secs == 0 {
            warn!("timeoutSecs is 0, using the default request timeout");
        }
        Self::with_timeout(&config.endpoint, config.timeout())
    }

    /// Create a transport for `endpoint` with an explicit request timeout.
    pub fn with_timeout(endpoint: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(HttpTransport {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Check the endpoint with a HEAD request.
    ///
    /// Returns `false` on any failure instead of propagating it.
    pub async fn check_health(&self) -> bool {
        match self.client.head(&self.endpoint).send().await {
            Ok(resp) => {
                debug!(status = %resp.status(), "health check response");
                resp.status().is_success()
            }
            Err(e) => {
                debug!(error = %e, "health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<String, TransportError> {
        debug!(
            endpoint = %self.endpoint,
            session = session_id,
            question = %truncate_string(message, 80),
            "Calling chat endpoint"
        );

        let form = [
            ("question", message),
            ("session_id", session_id),
            ("user_id", user_id),
        ];

        let result = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await;

        let response = match result {
            Ok(resp) => resp,
            Err(e) => {
                error!(error = %e, timeout = e.is_timeout(), "HTTP request failed");
                return Err(TransportError::network(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(status = %status, body = %error_text, "API error");
            return Err(TransportError::protocol(
                status.as_u16(),
                truncate_string(&error_text, MAX_ERROR_BODY_CHARS),
            ));
        }

        let body = response.text().await.map_err(|e| {
            error!(error = %e, "Failed to read response body");
            TransportError::network(e.to_string())
        })?;

        parse_answer(&body)
    }

    fn display_name(&self) -> &str {
        "HTTP"
    }
}

/// Extract a non-empty `answer` from a success body.
fn parse_answer(body: &str) -> Result<String, TransportError> {
    let parsed: AnswerBody = serde_json::from_str(body).map_err(|e| {
        warn!(error = %e, "Failed to parse chat response");
        TransportError::malformed(format!("invalid JSON body: {e}"))
    })?;

    match parsed.answer {
        Some(answer) if !answer.is_empty() => {
            debug!(chars = answer.chars().count(), "Chat response received");
            Ok(answer)
        }
        Some(_) => Err(TransportError::malformed("empty `answer` field")),
        None => Err(TransportError::malformed("missing `answer` field")),
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
