use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::agent::{Agent, PreviousMessage};
use crate::chat::{ChatBackend, ChatResponse};
use crate::error::{AgentError, ChatError};
use crate::llm::ChatModel;

/// Chat through a tool-calling [`Agent`] that remembers the conversation.
///
/// Calls are serialized so each turn sees the previous turn's memory.
pub struct AgentBackend {
    agent: Mutex<Agent>,
}

impl AgentBackend {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent: Mutex::new(agent),
        }
    }

    /// An agent with the default persona and no tools.
    pub fn with_model<M>(model: M) -> Result<Self, AgentError>
    where
        M: ChatModel + 'static,
    {
        Ok(Self::new(Agent::builder().model(model).build()?))
    }

    pub async fn previous_messages(&self) -> Vec<PreviousMessage> {
        self.agent.lock().await.previous_messages()
    }

    pub async fn clear_history(&self) {
        self.agent.lock().await.clear_history();
    }
}

#[async_trait]
impl ChatBackend for AgentBackend {
    async fn chat(&self, prompt: &str) -> Result<ChatResponse, ChatError> {
        let mut agent = self.agent.lock().await;
        let response = agent.query(prompt).await?;
        debug!(history = agent.messages_len(), "agent turn complete");
        Ok(ChatResponse::robot(response))
    }
}
