use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;

use super::*;
use crate::error::{ProviderError, ToolError};

#[derive(Default)]
struct MockModel {
    responses: Mutex<VecDeque<Result<ModelCompletion, ProviderError>>>,
    seen: Mutex<Vec<Vec<ModelMessage>>>,
}

impl MockModel {
    fn with_responses(responses: Vec<Result<ModelCompletion, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from(responses)),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatModel for MockModel {
    async fn invoke(
        &self,
        messages: &[ModelMessage],
        _tools: &[ModelToolDefinition],
    ) -> Result<ModelCompletion, ProviderError> {
        self.seen.lock().expect("lock poisoned").push(messages.to_vec());
        let mut guard = self.responses.lock().expect("lock poisoned");
        guard.pop_front().unwrap_or_else(|| {
            Err(ProviderError::Response("no more mock model responses".to_string()))
        })
    }
}

fn text(content: &str) -> Result<ModelCompletion, ProviderError> {
    Ok(ModelCompletion {
        text: Some(content.to_string()),
        tool_calls: vec![],
    })
}

fn call(
    id: &str,
    name: &str,
    arguments: serde_json::Value,
) -> Result<ModelCompletion, ProviderError> {
    Ok(ModelCompletion {
        text: None,
        tool_calls: vec![ModelToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }],
    })
}

fn add_tool() -> ToolSpec {
    ToolSpec::new("add", "add two numbers")
        .with_schema(json!({
            "type": "object",
            "properties": {
                "a": {"type": "integer"},
                "b": {"type": "integer"}
            },
            "required": ["a", "b"],
            "additionalProperties": false
        }))
        .expect("valid schema")
        .with_handler(|args| async move {
            let a = args["a"]
                .as_i64()
                .ok_or_else(|| ToolError::Execution("a missing".to_string()))?;
            let b = args["b"]
                .as_i64()
                .ok_or_else(|| ToolError::Execution("b missing".to_string()))?;
            Ok((a + b).to_string())
        })
}

fn fail_tool() -> ToolSpec {
    ToolSpec::new("fail", "always fail")
        .with_handler(|_args| async move { Err(ToolError::Execution("boom".to_string())) })
}

async fn collect_events(agent: &mut Agent, prompt: &str) -> Vec<AgentEvent> {
    agent
        .query_stream(prompt)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("events ok")
}

#[tokio::test]
async fn query_returns_plain_model_answer() {
    let mut agent = Agent::builder()
        .model(MockModel::with_responses(vec![text("hi, bob")]))
        .build()
        .expect("agent builds");

    let response = agent.query("hi, i am bob").await.expect("query succeeds");

    assert_eq!(response, "hi, bob");
}

#[tokio::test]
async fn tool_call_then_final_response_flow() {
    let mut agent = Agent::builder()
        .model(MockModel::with_responses(vec![
            call("call_1", "add", json!({"a": 2, "b": 3})),
            text("2 + 3 = 5"),
        ]))
        .tool(add_tool())
        .build()
        .expect("agent builds");

    let events = collect_events(&mut agent, "what is 2 + 3?").await;

    assert_eq!(events.len(), 4);
    assert!(matches!(events[0], AgentEvent::ToolCall { ref tool, .. } if tool == "add"));
    assert_eq!(
        events[1],
        AgentEvent::ToolResult {
            tool: "add".to_string(),
            result_text: "5".to_string(),
            tool_call_id: "call_1".to_string(),
            is_error: false,
        }
    );
    assert_eq!(
        events[3],
        AgentEvent::FinalResponse {
            content: "2 + 3 = 5".to_string()
        }
    );
}

#[tokio::test]
async fn tool_failures_are_reported_back_to_the_model() {
    let mut agent = Agent::builder()
        .model(MockModel::with_responses(vec![
            call("call_1", "fail", json!({})),
            call("call_2", "missing", json!({})),
            text("fallback"),
        ]))
        .tool(fail_tool())
        .build()
        .expect("agent builds");

    let events = collect_events(&mut agent, "try").await;

    let errors = events
        .iter()
        .filter(|event| matches!(event, AgentEvent::ToolResult { is_error: true, .. }))
        .count();
    assert_eq!(errors, 2);
    assert_eq!(
        events.last(),
        Some(&AgentEvent::FinalResponse {
            content: "fallback".to_string()
        })
    );
}

#[tokio::test]
async fn max_iterations_error_when_tool_loop_never_finishes() {
    let mut agent = Agent::builder()
        .model(MockModel::with_responses(vec![
            call("call_1", "add", json!({"a": 1, "b": 1})),
            call("call_2", "add", json!({"a": 1, "b": 1})),
        ]))
        .tool(add_tool())
        .max_iterations(2)
        .build()
        .expect("agent builds");

    let err = agent.query("loop").await.expect_err("must fail");
    assert!(matches!(err, AgentError::MaxIterationsReached { max_iterations: 2 }));
}

#[tokio::test]
async fn provider_error_aborts_the_turn() {
    let mut agent = Agent::builder()
        .model(MockModel::with_responses(vec![Err(ProviderError::Request(
            "offline".to_string(),
        ))]))
        .build()
        .expect("agent builds");

    let err = agent.query("hello").await.expect_err("must fail");
    assert!(matches!(err, AgentError::Provider(ProviderError::Request(_))));
}

#[tokio::test]
async fn memory_carries_across_turns() {
    let model = Arc::new(MockModel::with_responses(vec![
        text("Hello Bob!"),
        text("Your name is Bob."),
    ]));
    let mut agent = Agent::builder()
        .shared_model(model.clone())
        .build()
        .expect("agent builds");

    agent.query("hi, i am bob").await.expect("first turn");
    agent.query("whats my name?").await.expect("second turn");

    let seen = model.seen.lock().expect("lock poisoned");
    assert_eq!(seen.len(), 2);
    assert!(matches!(seen[1][0], ModelMessage::System(_)));
    assert_eq!(seen[1].len(), 4);
    assert_eq!(seen[1][1], ModelMessage::User("hi, i am bob".to_string()));

    assert_eq!(
        agent.previous_messages(),
        vec![
            PreviousMessage {
                role: ConversationRole::Human,
                content: "hi, i am bob".to_string(),
            },
            PreviousMessage {
                role: ConversationRole::Ai,
                content: "Hello Bob!".to_string(),
            },
            PreviousMessage {
                role: ConversationRole::Human,
                content: "whats my name?".to_string(),
            },
            PreviousMessage {
                role: ConversationRole::Ai,
                content: "Your name is Bob.".to_string(),
            },
        ]
    );

    agent.clear_history();
    assert_eq!(agent.messages_len(), 0);
    assert!(agent.previous_messages().is_empty());
}

#[tokio::test]
async fn previous_messages_skip_tool_round_trips() {
    let mut agent = Agent::builder()
        .model(MockModel::with_responses(vec![
            call("call_1", "add", json!({"a": 1, "b": 2})),
            text("3"),
        ]))
        .tool(add_tool())
        .without_system_prompt()
        .build()
        .expect("agent builds");

    agent.query("1 + 2").await.expect("query succeeds");

    assert_eq!(agent.messages_len(), 4);
    assert_eq!(
        agent
            .previous_messages()
            .iter()
            .map(|message| (message.role.as_str(), message.content.as_str()))
            .collect::<Vec<_>>(),
        vec![("Human", "1 + 2"), ("AI", "3")]
    );
}

#[test]
fn builder_rejects_missing_model_and_duplicate_tools() {
    let err = Agent::builder().build().err().expect("must fail");
    assert!(matches!(err, AgentError::Config(message) if message.contains("model")));

    let err = Agent::builder()
        .model(MockModel::default())
        .tools([add_tool(), add_tool()])
        .build()
        .err()
        .expect("must fail");
    assert!(matches!(err, AgentError::Config(message) if message.contains("duplicate")));
}

#[tokio::test]
async fn failed_turn_leaves_no_trace_in_memory() {
    let model = Arc::new(MockModel::with_responses(vec![
        Err(ProviderError::Request("offline".to_string())),
        text("Hello!"),
    ]));
    let mut agent = Agent::builder()
        .shared_model(model.clone())
        .build()
        .expect("agent builds");

    agent.query("first, failed").await.expect_err("first turn fails");
    assert_eq!(agent.messages_len(), 0);

    agent.query("second").await.expect("second turn");

    let seen = model.seen.lock().expect("lock poisoned");
    assert_eq!(seen[1].len(), 2);
    assert!(matches!(seen[1][0], ModelMessage::System(_)));
    assert_eq!(seen[1][1], ModelMessage::User("second".to_string()));
    assert_eq!(
        agent
            .previous_messages()
            .iter()
            .map(|message| (message.role.as_str(), message.content.as_str()))
            .collect::<Vec<_>>(),
        vec![("Human", "second"), ("AI", "Hello!")]
    );
}

#[tokio::test]
async fn exhausted_turn_rolls_back_to_previous_conversation() {
    let mut agent = Agent::builder()
        .model(MockModel::with_responses(vec![
            text("Hi Bob."),
            call("call_1", "add", json!({"a": 1, "b": 1})),
        ]))
        .tool(add_tool())
        .max_iterations(1)
        .build()
        .expect("agent builds");

    agent.query("hi, i am bob").await.expect("first turn");
    let before = agent.messages_len();

    let err = agent.query("loop forever").await.expect_err("must fail");
    assert!(matches!(err, AgentError::MaxIterationsReached { .. }));
    assert_eq!(agent.messages_len(), before);
    assert_eq!(agent.previous_messages().len(), 2);
}
