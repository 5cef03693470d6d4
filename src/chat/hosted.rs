use async_trait::async_trait;

use crate::chat::{ChatBackend, ChatResponse};
use crate::error::{ChatError, ProviderError};
use crate::llm::{ChatModel, ModelMessage};

/// Single-turn chat against a hosted model. No history is kept; each prompt
/// is sent as the only user message.
#[derive(Debug, Clone)]
pub struct HostedModelBackend<M> {
    model: M,
}

impl<M> HostedModelBackend<M>
where
    M: ChatModel,
{
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

#[async_trait]
impl<M> ChatBackend for HostedModelBackend<M>
where
    M: ChatModel,
{
    async fn chat(&self, prompt: &str) -> Result<ChatResponse, ChatError> {
        let completion = self
            .model
            .invoke(&[ModelMessage::User(prompt.to_string())], &[])
            .await?;

        let text = completion
            .text
            .ok_or_else(|| ProviderError::Response("completion has no text".to_string()))?;

        Ok(ChatResponse::robot(text))
    }
}
