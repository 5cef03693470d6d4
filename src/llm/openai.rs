use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::llm::{ChatModel, ModelCompletion, ModelMessage, ModelToolCall, ModelToolDefinition};

const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiModelConfig {
    pub api_key: String,
    pub model: String,
    pub api_base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl OpenAiModelConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_base_url: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Reads `OPENAI_API_KEY` and, if set, `OPENAI_BASE_URL`.
    pub fn from_env(model: impl Into<String>) -> Result<Self, ProviderError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ProviderError::Request("OPENAI_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key, model);
        config.api_base_url = std::env::var("OPENAI_BASE_URL").ok();
        Ok(config)
    }
}

/// OpenAI chat completions adapter implementing [`ChatModel`].
#[derive(Debug, Clone)]
pub struct OpenAiModel {
    client: Client,
    config: OpenAiModelConfig,
}

impl OpenAiModel {
    pub fn new(config: OpenAiModelConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(OpenAiModelConfig::from_env(model)?)
    }

    pub fn config(&self) -> &OpenAiModelConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .api_base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE_URL)
            .trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl ChatModel for OpenAiModel {
    async fn invoke(
        &self,
        messages: &[ModelMessage],
        tools: &[ModelToolDefinition],
    ) -> Result<ModelCompletion, ProviderError> {
        let request = build_request(messages, tools, &self.config);
        debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = tools.len(),
            "POST chat/completions"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        if !response.status().is_success() {
            let message = extract_api_error(response).await;
            warn!(%message, "chat completion failed");
            return Err(ProviderError::Request(message));
        }

        let payload = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|err| ProviderError::Response(err.to_string()))?;

        normalize_response(payload)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<RequestMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum RequestMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<WireToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct ToolDefinition {
    #[serde(rename = "type")]
    type_: &'static str,
    function: FunctionDefinition,
}

#[derive(Debug, Serialize)]
struct FunctionDefinition {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    type_: String,
    function: WireFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<AssistantMessage>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<Value>,
}

fn build_request(
    messages: &[ModelMessage],
    tools: &[ModelToolDefinition],
    config: &OpenAiModelConfig,
) -> ChatCompletionRequest {
    let (tools, tool_choice) = if tools.is_empty() {
        (None, None)
    } else {
        let definitions = tools
            .iter()
            .map(|tool| ToolDefinition {
                type_: "function",
                function: FunctionDefinition {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    parameters: tool.parameters.clone(),
                },
            })
            .collect();
        (Some(definitions), Some("auto".to_string()))
    };

    ChatCompletionRequest {
        model: config.model.clone(),
        messages: messages.iter().filter_map(to_request_message).collect(),
        tools,
        tool_choice,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

fn to_request_message(message: &ModelMessage) -> Option<RequestMessage> {
    match message {
        ModelMessage::System(content) => Some(RequestMessage::System {
            content: content.clone(),
        }),
        ModelMessage::User(content) => Some(RequestMessage::User {
            content: content.clone(),
        }),
        ModelMessage::Assistant {
            content,
            tool_calls,
        } => {
            let content = content.as_ref().filter(|text| !text.is_empty()).cloned();
            if content.is_none() && tool_calls.is_empty() {
                return None;
            }
            Some(RequestMessage::Assistant {
                content,
                tool_calls: tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        type_: function_type(),
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect(),
            })
        }
        ModelMessage::ToolResult {
            tool_call_id,
            content,
            is_error,
        } => Some(RequestMessage::Tool {
            tool_call_id: tool_call_id.clone(),
            content: if *is_error {
                format!("Error: {content}")
            } else {
                content.clone()
            },
        }),
    }
}

fn normalize_response(response: ChatCompletionResponse) -> Result<ModelCompletion, ProviderError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .ok_or_else(|| ProviderError::Response("completion has no choices".to_string()))?;

    let tool_calls = message
        .tool_calls
        .into_iter()
        .map(|call| -> Result<ModelToolCall, ProviderError> {
            let arguments = if call.function.arguments.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str::<Value>(&call.function.arguments).map_err(|err| {
                    ProviderError::Response(format!(
                        "arguments for tool '{}' are not valid JSON: {err}",
                        call.function.name
                    ))
                })?
            };
            Ok(ModelToolCall {
                id: call.id,
                name: call.function.name,
                arguments,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModelCompletion {
        text: message.content.filter(|text| !text.is_empty()),
        tool_calls,
    })
}

async fn extract_api_error(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(parsed) => {
            let code = match parsed.error.code {
                Some(Value::String(code)) => code,
                Some(other) => other.to_string(),
                None => status.as_u16().to_string(),
            };
            let kind = parsed.error.type_.unwrap_or_else(|| "api_error".to_string());
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| "no message".to_string());
            format!("openai {kind} ({code}): {message}")
        }
        Err(_) if body.is_empty() => format!("openai request failed ({status})"),
        Err(_) => format!("openai request failed ({status}): {body}"),
    }
}
