use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatTransport, TransportError};
use crate::config::Config;
use crate::persona::Persona;
use crate::state::{ChatMessage, ChatRole};

pub const CHAT_PATH: &str = "/api/chat";

/// Outbound message shape: local id and timestamp stay on this side
#[derive(Serialize)]
struct ChatMessageDto<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequestDto<'a> {
    persona: Persona,
    messages: Vec<ChatMessageDto<'a>>,
}

impl<'a> ChatRequestDto<'a> {
    fn new(persona: Persona, history: &'a [ChatMessage]) -> Self {
        Self {
            persona,
            messages: history
                .iter()
                .map(|m| ChatMessageDto {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponseDto {
    reply: String,
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

#[derive(Clone)]
pub struct EldermindClient {
    client: Client,
    base_url: String,
}

impl EldermindClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatTransport for EldermindClient {
    async fn send(
        &self,
        persona: Persona,
        history: &[ChatMessage],
    ) -> Result<ChatMessage, TransportError> {
        let url = format!("{}{}", self.base_url, CHAT_PATH);

        let request = ChatRequestDto::new(persona, history);

        debug!(%url, %persona, messages = history.len(), "POST chat payload");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponseDto = serde_json::from_str(&body)?;

        debug!(
            reply_chars = chat_response.reply.chars().count(),
            prompt_tokens = ?chat_response.prompt_tokens,
            completion_tokens = ?chat_response.completion_tokens,
            "Raw backend response"
        );

        Ok(ChatMessage::assistant(chat_response.reply))
    }
}
