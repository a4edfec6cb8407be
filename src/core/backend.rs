use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::core::error::ExchangeError;

/// Raw body reads, in whatever sizes the transport delivers them.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ExchangeError>> + Send>>;

/// The services an exchange needs from the outside world.
///
/// Injected into the controller at construction; the HTTP implementation
/// lives in [`crate::api::HttpBackend`].
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Submit `text` to the session and return the streaming response body.
    async fn send_message(&self, session_id: &str, text: &str)
        -> Result<ChunkStream, ExchangeError>;

    /// Record a freshly derived name for the session.
    async fn update_session_name(
        &self,
        session_id: &str,
        name: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Refresh the session summaries (message counts etc.) after an exchange.
    async fn refresh_sessions(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
