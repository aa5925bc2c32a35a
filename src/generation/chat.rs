use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use tracing::{debug, instrument};

use super::error::GenerationError;
use super::{ChatTurn, Generator, Role, SamplingParams};

/// Chat-completion generator for one model, via `genai` (Ollama, OpenAI, ...).
#[derive(Clone)]
pub struct ChatGenerator {
    client: Client,
    model: String,
}

impl std::fmt::Debug for ChatGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatGenerator")
            .field("model", &self.model)
            .finish()
    }
}

impl ChatGenerator {
    pub fn new(client: Client, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn to_request(messages: &[ChatTurn]) -> ChatRequest {
        let messages: Vec<ChatMessage> = messages
            .iter()
            .map(|turn| match turn.role {
                Role::System => ChatMessage::system(turn.content.clone()),
                Role::User => ChatMessage::user(turn.content.clone()),
                Role::Assistant => ChatMessage::assistant(turn.content.clone()),
            })
            .collect();
        ChatRequest::new(messages)
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, messages, sampling), fields(model = %self.model))]
    async fn generate(
        &self,
        messages: &[ChatTurn],
        sampling: &SamplingParams,
    ) -> Result<String, GenerationError> {
        let options = ChatOptions::default()
            .with_temperature(sampling.temperature)
            .with_max_tokens(sampling.max_tokens)
            .with_top_p(sampling.top_p);

        let response = self
            .client
            .exec_chat(&self.model, Self::to_request(messages), Some(&options))
            .await
            .map_err(|e| GenerationError::Backend {
                model: self.model.clone(),
                reason: e.to_string(),
            })?;

        let text = response.first_text().unwrap_or_default().to_string();
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse {
                model: self.model.clone(),
            });
        }

        debug!(chars = text.len(), "generation complete");
        Ok(text)
    }
}
