//! Core types for Cedarbot — sessions, chat messages, and attachment references.
//!
//! A conversation is an ordered `Vec<Message>` scoped by a [`Session`]. Messages
//! are immutable once appended; a failed exchange is recorded as a new bot
//! message carrying the [`TransportError`] that caused it.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Content used for a user message that carries attachments but no text.
pub const ATTACHMENT_PLACEHOLDER: &str = "📎 Attachment sent";

// ─────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────

/// The identity pair scoping a conversation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// The last `len` characters of the session id, for compact display.
    pub fn short_id(&self, len: usize) -> &str {
        let count = self.session_id.chars().count();
        if count <= len {
            return &self.session_id;
        }
        let start = self
            .session_id
            .char_indices()
            .nth(count - len)
            .map_or(0, |(idx, _)| idx);
        &self.session_id[start..]
    }
}

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// Who authored a message.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry of the conversation history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// `{prefix}_{seq}` — unique within a session, ordered by `seq`.
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    /// Only ever populated on user messages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRef>,
    /// Set on bot messages that stand in for a failed exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<TransportError>,
}

impl Message {
    /// Create a user message. Blank `text` with attachments falls back to
    /// [`ATTACHMENT_PLACEHOLDER`].
    pub fn user(seq: u64, text: &str, attachments: Vec<AttachmentRef>) -> Self {
        let trimmed = text.trim();
        let content = if trimmed.is_empty() {
            ATTACHMENT_PLACEHOLDER.to_string()
        } else {
            trimmed.to_string()
        };
        Message {
            id: format!("user_{seq}"),
            content,
            sender: Sender::User,
            timestamp: Utc::now(),
            attachments,
            failure: None,
        }
    }

    /// Create a bot message holding an answer from the endpoint.
    pub fn bot(seq: u64, answer: impl Into<String>) -> Self {
        Message {
            id: format!("bot_{seq}"),
            content: answer.into(),
            sender: Sender::Bot,
            timestamp: Utc::now(),
            attachments: Vec::new(),
            failure: None,
        }
    }

    /// Create a bot message describing a failed exchange.
    pub fn error(seq: u64, failure: TransportError) -> Self {
        Message {
            id: format!("error_{seq}"),
            content: failure.user_message(),
            sender: Sender::Bot,
            timestamp: Utc::now(),
            attachments: Vec::new(),
            failure: Some(failure),
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_error(&self) -> bool {
        self.failure.is_some()
    }
}

// ─────────────────────────────────────────────
// Attachments
// ─────────────────────────────────────────────

/// Metadata describing a file the user attached. The bytes themselves are
/// never sent to the endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentRef {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl AttachmentRef {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        AttachmentRef {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes,
        }
    }

    /// Build a reference from a local file (name, size, extension-based MIME type).
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        if !meta.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(AttachmentRef::new(name, mime_for_path(path), meta.len()))
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Guess a MIME type from a file extension.
fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
