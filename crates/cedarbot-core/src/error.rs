//! Error taxonomy shared by the session, transport, and conversation layers.
//!
//! - [`ValidationError`] is the only error that reaches the caller of the core
//!   (rejected `start`).
//! - [`TransportError`] is raised by a `ChatTransport` and absorbed by the
//!   conversation controller into a bot message.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Input rejected before any session is created.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("user id cannot be empty")]
    EmptyUserId,
}

/// Which layer of the exchange failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportErrorKind {
    /// Connection, DNS, or timeout failure.
    Network,
    /// Non-success status code.
    Protocol,
    /// Success status but no usable `answer` in the body.
    Malformed,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Network => "network",
            TransportErrorKind::Protocol => "protocol",
            TransportErrorKind::Malformed => "malformed",
        };
        f.write_str(name)
    }
}

/// A failed request/response exchange with the chat endpoint.
///
/// `detail` carries the raw diagnostic (underlying error, or status + body)
/// and is meant for logs, not for the conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} error: {detail}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub detail: String,
    /// HTTP status, present for `Protocol` failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl TransportError {
    pub fn network(detail: impl Into<String>) -> Self {
        TransportError {
            kind: TransportErrorKind::Network,
            detail: detail.into(),
            status: None,
        }
    }

    pub fn protocol(status: u16, body: impl AsRef<str>) -> Self {
        TransportError {
            kind: TransportErrorKind::Protocol,
            detail: format!("status {}: {}", status, body.as_ref()),
            status: Some(status),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        TransportError {
            kind: TransportErrorKind::Malformed,
            detail: detail.into(),
            status: None,
        }
    }

    /// Human-readable description suitable for the conversation history.
    pub fn user_message(&self) -> String {
        match self.kind {
            TransportErrorKind::Network => {
                "Network error. Please check your internet connection and try again.".to_string()
            }
            TransportErrorKind::Protocol => match self.status {
                Some(status) => format!("API error: HTTP error! status: {status}"),
                None => "API error: the chatbot returned an unexpected status.".to_string(),
            },
            TransportErrorKind::Malformed => {
                "API error: no answer received from the chatbot.".to_string()
            }
        }
    }
}
