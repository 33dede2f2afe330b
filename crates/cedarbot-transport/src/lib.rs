//! Transport layer for Cedarbot.
//!
//! # Architecture
//!
//! - [`traits::ChatTransport`] — trait the conversation controller calls once per turn
//! - [`http_transport::HttpTransport`] — form-encoded POST client for the chat endpoint
//!
//! The error taxonomy lives in `cedarbot_core::error` so that history entries
//! can record it; it is re-exported here for convenience.

pub mod http_transport;
pub mod traits;

// Re-export main types for convenience
pub use cedarbot_core::error::{TransportError, TransportErrorKind};
pub use http_transport::HttpTransport;
pub use traits::ChatTransport;
