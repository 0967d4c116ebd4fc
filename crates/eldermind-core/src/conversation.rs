//! Conversation state manager
//!
//! Owns the message history, the in-flight/error status and the active
//! persona for one session. The only way to grow the history is
//! [`Conversation::send_user_message`] (or its two halves,
//! [`Conversation::begin_send`] and [`Conversation::finish_send`], for front
//! ends that run the network call on their own task).

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api::{ChatTransport, TransportError};
use crate::persona::Persona;
use crate::state::ChatMessage;

/// Shown to the user for any failed send. The real cause only goes to the log.
pub const SEND_FAILED_MESSAGE: &str = "Something went wrong talking to the assistant.";

pub struct Conversation {
    transport: Arc<dyn ChatTransport>,
    messages: Vec<ChatMessage>,
    persona: Persona,
    error: Option<String>,
    // History as of the user message of the exchange in flight
    in_flight: Option<Vec<ChatMessage>>,
}

/// An outbound request detached from the conversation so it can be awaited
/// (or spawned) without holding a borrow on it.
pub struct ChatExchange {
    transport: Arc<dyn ChatTransport>,
    persona: Persona,
    history: Vec<ChatMessage>,
}

impl ChatExchange {
    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub async fn run(self) -> Result<ChatMessage, TransportError> {
        self.transport.send(self.persona, &self.history).await
    }
}

impl Conversation {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            messages: Vec::new(),
            persona: Persona::default(),
            error: None,
            in_flight: None,
        }
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Takes effect on the next send; messages already sent are untouched.
    pub fn set_persona(&mut self, persona: Persona) {
        self.persona = persona;
    }

    /// Send `text` and wait for the reply. Failures end up in [`Self::error`].
    pub async fn send_user_message(&mut self, text: &str) {
        if let Some(exchange) = self.begin_send(text) {
            let outcome = exchange.run().await;
            self.finish_send(outcome);
        }
    }

    /// Append the user message and hand back the request to run.
    ///
    /// Returns `None` without touching any state when `text` is blank or an
    /// exchange is already in flight.
    pub fn begin_send(&mut self, text: &str) -> Option<ChatExchange> {
        if text.trim().is_empty() {
            return None;
        }
        if self.is_loading() {
            warn!("send rejected: a chat request is already in flight");
            return None;
        }

        let mut next_messages = self.messages.clone();
        next_messages.push(ChatMessage::user(text));
        self.messages = next_messages.clone();

        self.error = None;

        debug!(
            persona = %self.persona,
            messages = next_messages.len(),
            "Sending messages to backend"
        );

        self.in_flight = Some(next_messages.clone());

        Some(ChatExchange {
            transport: Arc::clone(&self.transport),
            persona: self.persona,
            history: next_messages,
        })
    }

    /// Record the outcome of the exchange started by [`Self::begin_send`].
    pub fn finish_send(&mut self, outcome: Result<ChatMessage, TransportError>) {
        let Some(mut snapshot) = self.in_flight.take() else {
            warn!("finish_send called with no chat request in flight");
            return;
        };

        match outcome {
            Ok(reply) => {
                info!(
                    reply_id = %reply.id,
                    chars = reply.content.chars().count(),
                    "Received assistant message"
                );
                snapshot.push(reply);
                self.messages = snapshot;
            }
            Err(err) => {
                error!(error = %err, "Chat API error");
                self.messages = snapshot;
                self.error = Some(SEND_FAILED_MESSAGE.to_string());
            }
        }
    }
}
