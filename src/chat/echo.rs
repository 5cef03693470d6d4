use async_trait::async_trait;

use crate::chat::{ChatBackend, ChatResponse};
use crate::error::ChatError;

/// Canned responder for wiring tests and demos.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoBackend;

#[async_trait]
impl ChatBackend for EchoBackend {
    async fn chat(&self, prompt: &str) -> Result<ChatResponse, ChatError> {
        Ok(ChatResponse::robot(format!("hello, {prompt}!")))
    }
}
