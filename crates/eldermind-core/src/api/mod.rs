pub mod eldermind;

use async_trait::async_trait;

use crate::persona::Persona;
use crate::state::ChatMessage;

pub use eldermind::EldermindClient;

/// One request/response cycle with the remote chat endpoint.
///
/// Implementations are stateless per call: the whole history goes out every
/// time and the next assistant message comes back.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        persona: Persona,
        history: &[ChatMessage],
    ) -> Result<ChatMessage, TransportError>;
}

/// Why a chat request failed. Only for diagnostics, callers treat every variant alike.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The task driving the request panicked or was cancelled
    #[error("request interrupted: {0}")]
    Interrupted(String),
}
