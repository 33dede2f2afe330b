//! Cedarbot Chat — the conversation controller.
//!
//! This crate contains:
//! - **controller**: message history, single-flight turns, error-to-message translation
//! - **draft**: the caller's pending text and attachments

pub mod controller;
pub mod draft;

pub use controller::{ConversationController, ConversationSnapshot, RejectReason, SubmitOutcome};
pub use draft::Draft;
