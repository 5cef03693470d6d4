//! Tool-calling conversational agent with buffered conversation memory.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_stream::try_stream;
use futures_util::{Stream, StreamExt};
use tracing::debug;

use crate::error::AgentError;
use crate::llm::{ChatModel, ModelCompletion, ModelMessage, ModelToolCall, ModelToolDefinition};
use crate::tools::ToolSpec;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
Assistant is a large language model designed to assist with a wide range of tasks, \
from answering simple questions to providing in-depth explanations and discussions. \
Assistant engages in natural-sounding conversation and gives coherent, relevant answers.

Use a tool only when it is needed to answer. When you have a response for the Human, \
or if you do not need a tool, reply with the final answer directly.";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_iterations: u32,
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 24,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

/// Intermediate steps of one agent turn, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Text {
        content: String,
    },
    ToolCall {
        tool: String,
        args_json: serde_json::Value,
        tool_call_id: String,
    },
    ToolResult {
        tool: String,
        result_text: String,
        tool_call_id: String,
        is_error: bool,
    },
    FinalResponse {
        content: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationRole {
    Human,
    Ai,
}

impl ConversationRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::Ai => "AI",
        }
    }
}

impl fmt::Display for ConversationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousMessage {
    pub role: ConversationRole,
    pub content: String,
}

#[derive(Default)]
pub struct AgentBuilder {
    model: Option<Arc<dyn ChatModel>>,
    tools: Vec<ToolSpec>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn model<M>(mut self, model: M) -> Self
    where
        M: ChatModel + 'static,
    {
        self.model = Some(Arc::new(model));
        self
    }

    pub fn shared_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn tool(mut self, tool: ToolSpec) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = ToolSpec>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn without_system_prompt(mut self) -> Self {
        self.config.system_prompt = None;
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    pub fn build(self) -> Result<Agent, AgentError> {
        let Some(model) = self.model else {
            return Err(AgentError::Config(
                "agent model must be configured via AgentBuilder::model(...)".to_string(),
            ));
        };

        if self.config.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be positive".to_string()));
        }

        let mut tool_map = HashMap::new();
        for tool in self.tools {
            let name = tool.name().to_string();
            if tool_map.insert(name.clone(), tool).is_some() {
                return Err(AgentError::Config(format!("duplicate tool registered: {name}")));
            }
        }

        let mut definitions = tool_map
            .values()
            .map(ToolSpec::definition)
            .collect::<Vec<_>>();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Agent {
            model,
            tool_map,
            definitions,
            config: self.config,
            history: Vec::new(),
        })
    }
}

pub struct Agent {
    model: Arc<dyn ChatModel>,
    tool_map: HashMap<String, ToolSpec>,
    definitions: Vec<ModelToolDefinition>,
    config: AgentConfig,
    history: Vec<ModelMessage>,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn messages_len(&self) -> usize {
        self.history.len()
    }

    /// User inputs and final answers so far, oldest first.
    pub fn previous_messages(&self) -> Vec<PreviousMessage> {
        self.history
            .iter()
            .filter_map(|message| match message {
                ModelMessage::User(content) => Some(PreviousMessage {
                    role: ConversationRole::Human,
                    content: content.clone(),
                }),
                ModelMessage::Assistant {
                    content: Some(content),
                    tool_calls,
                } if tool_calls.is_empty() && !content.is_empty() => Some(PreviousMessage {
                    role: ConversationRole::Ai,
                    content: content.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    pub async fn query(&mut self, user_message: impl Into<String>) -> Result<String, AgentError> {
        let stream = self.query_stream(user_message);
        futures_util::pin_mut!(stream);

        let mut final_response = None;
        while let Some(event) = stream.next().await {
            if let AgentEvent::FinalResponse { content } = event? {
                final_response = Some(content);
            }
        }

        final_response.ok_or(AgentError::MissingFinalResponse)
    }

    /// Runs one turn, yielding each model reply and tool round trip.
    ///
    /// The turn ends at the first model reply without tool calls. Tool
    /// failures are fed back to the model as error results. If the turn
    /// fails, memory is rolled back to where it was before the turn began.
    pub fn query_stream(
        &mut self,
        user_message: impl Into<String>,
    ) -> impl Stream<Item = Result<AgentEvent, AgentError>> + '_ {
        let user_message = user_message.into();

        try_stream! {
            let turn_start = self.history.len();
            if self.history.is_empty() {
                if let Some(system_prompt) = &self.config.system_prompt {
                    self.history.push(ModelMessage::System(system_prompt.clone()));
                }
            }
            self.history.push(ModelMessage::User(user_message));

            for iteration in 0..self.config.max_iterations {
                let invoked = self.model.invoke(&self.history, &self.definitions).await;
                let completion = match invoked {
                    Ok(completion) => completion,
                    Err(err) => {
                        self.history.truncate(turn_start);
                        Err::<ModelCompletion, AgentError>(err.into())?
                    }
                };
                debug!(
                    iteration,
                    tool_calls = completion.tool_calls.len(),
                    "agent model replied"
                );
                self.remember(&completion);

                if let Some(text) = completion.text.clone() {
                    yield AgentEvent::Text { content: text };
                }

                if completion.tool_calls.is_empty() {
                    yield AgentEvent::FinalResponse {
                        content: completion.text.unwrap_or_default(),
                    };
                    return;
                }

                for call in completion.tool_calls {
                    yield AgentEvent::ToolCall {
                        tool: call.name.clone(),
                        args_json: call.arguments.clone(),
                        tool_call_id: call.id.clone(),
                    };

                    let (result_text, is_error) = self.run_tool(&call).await;
                    self.history.push(ModelMessage::ToolResult {
                        tool_call_id: call.id.clone(),
                        content: result_text.clone(),
                        is_error,
                    });

                    yield AgentEvent::ToolResult {
                        tool: call.name,
                        result_text,
                        tool_call_id: call.id,
                        is_error,
                    };
                }
            }

            self.history.truncate(turn_start);
            Err::<(), AgentError>(AgentError::MaxIterationsReached {
                max_iterations: self.config.max_iterations,
            })?;
        }
    }

    fn remember(&mut self, completion: &ModelCompletion) {
        self.history.push(ModelMessage::Assistant {
            content: completion.text.clone(),
            tool_calls: completion.tool_calls.clone(),
        });
    }

    async fn run_tool(&self, call: &ModelToolCall) -> (String, bool) {
        let Some(tool) = self.tool_map.get(&call.name) else {
            return (format!("Unknown tool '{}'.", call.name), true);
        };

        debug!(tool = %call.name, id = %call.id, "executing tool call");
        match tool.execute(call.arguments.clone()).await {
            Ok(text) => (text, false),
            Err(err) => (err.to_string(), true),
        }
    }
}

#[cfg(test)]
mod tests;
