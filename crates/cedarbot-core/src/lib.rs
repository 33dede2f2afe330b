//! Core types, session lifecycle, config, and utilities for Cedarbot.

pub mod config;
pub mod error;
pub mod session;
pub mod types;
pub mod utils;

pub use error::{TransportError, TransportErrorKind, ValidationError};
pub use session::SessionManager;
pub use types::{AttachmentRef, Message, Sender, Session, ATTACHMENT_PLACEHOLDER};
