//! One-function chat capability with interchangeable backends.

mod agent;
mod echo;
mod hosted;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::llm::{OpenAiModel, OpenAiModelConfig};

pub use agent::AgentBackend;
pub use echo::EchoBackend;
pub use hosted::HostedModelBackend;

pub const DEFAULT_HOSTED_MODEL: &str = "gpt-3.5-turbo";

/// The agent backend samples deterministically.
pub const AGENT_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Robot,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Robot => f.write_str("robot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub role: ChatRole,
}

impl ChatResponse {
    pub fn robot(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            role: ChatRole::Robot,
        }
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, prompt: &str) -> Result<ChatResponse, ChatError>;
}

/// Which backend to compose at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Echo,
    Hosted,
    Agent,
}

impl FromStr for BackendKind {
    type Err = ChatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "echo" | "simple" => Ok(Self::Echo),
            "hosted" | "openai" => Ok(Self::Hosted),
            "agent" => Ok(Self::Agent),
            other => Err(ChatError::Config(format!(
                "unknown chat backend '{other}' (expected echo, hosted or agent)"
            ))),
        }
    }
}

/// Builds the selected backend; hosted and agent read `OPENAI_API_KEY`.
pub fn backend_from_env(
    kind: BackendKind,
    model: Option<&str>,
) -> Result<Box<dyn ChatBackend>, ChatError> {
    let model = model.unwrap_or(DEFAULT_HOSTED_MODEL);
    let backend: Box<dyn ChatBackend> = match kind {
        BackendKind::Echo => Box::new(EchoBackend),
        BackendKind::Hosted => Box::new(HostedModelBackend::new(OpenAiModel::from_env(model)?)),
        BackendKind::Agent => {
            let config = agent_model_config(OpenAiModelConfig::from_env(model)?);
            Box::new(AgentBackend::with_model(OpenAiModel::new(config)?)?)
        }
    };
    Ok(backend)
}

fn agent_model_config(mut config: OpenAiModelConfig) -> OpenAiModelConfig {
    config.temperature = Some(AGENT_TEMPERATURE);
    config
}
