//! Chat transport trait — the seam between the conversation controller and
//! the network.
//!
//! `HttpTransport` in `http_transport.rs` is the production implementation;
//! tests plug in scripted in-memory transports.

use async_trait::async_trait;
use cedarbot_core::error::TransportError;

/// Performs one request/response exchange with the question-answering endpoint.
///
/// The controller never calls `send` concurrently for the same session; the
/// transport does not need to guard against it.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Ask `message` on behalf of `user_id` within `session_id`.
    ///
    /// # Returns
    /// The endpoint's answer text, or a [`TransportError`] classifying the
    /// failure as network, protocol, or malformed.
    async fn send(
        &self,
        user_id: &str,
        session_id: &str,
        message: &str,
    ) -> Result<String, TransportError>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
