//! Tools the conversational agent may call.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value, json};

use crate::error::{SchemaError, ToolError};
use crate::llm::ModelToolDefinition;

type ToolHandler = dyn Fn(Value) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync;

/// A named async function with a JSON schema for its arguments.
#[derive(Clone)]
pub struct ToolSpec {
    name: String,
    description: String,
    json_schema: Value,
    handler: Arc<ToolHandler>,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl ToolSpec {
    /// A tool accepting any object and failing until a handler is attached.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            json_schema: json!({"type": "object", "properties": {}}),
            handler: Arc::new(|_args| {
                Box::pin(async {
                    Err(ToolError::Execution("tool handler not configured".to_string()))
                })
            }),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Result<Self, SchemaError> {
        validate_schema(&schema)?;
        self.json_schema = schema;
        Ok(self)
    }

    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        self.handler = Arc::new(move |args| Box::pin(handler(args)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn json_schema(&self) -> &Value {
        &self.json_schema
    }

    pub fn definition(&self) -> ModelToolDefinition {
        ModelToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.json_schema.clone(),
        }
    }

    /// Validates `args` against the schema, then runs the handler.
    pub async fn execute(&self, args: Value) -> Result<String, ToolError> {
        validate_arguments(&self.name, &self.json_schema, &args)?;
        (self.handler)(args).await
    }
}

fn validate_schema(schema: &Value) -> Result<(), SchemaError> {
    let schema = schema.as_object().ok_or(SchemaError::SchemaNotObject)?;

    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Err(SchemaError::RootTypeMustBeObject);
    }

    match schema.get("required") {
        None => Ok(()),
        Some(Value::Array(fields)) if fields.iter().all(Value::is_string) => Ok(()),
        Some(_) => Err(SchemaError::InvalidRequired),
    }
}

fn validate_arguments(tool: &str, schema: &Value, args: &Value) -> Result<(), ToolError> {
    let invalid = |message: String| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message,
    };

    let args = args
        .as_object()
        .ok_or_else(|| invalid("arguments must be a JSON object".to_string()))?;

    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let required = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str);
    for field in required {
        if !args.contains_key(field) {
            return Err(invalid(format!("missing required field: {field}")));
        }
    }

    let closed = schema.get("additionalProperties").and_then(Value::as_bool) == Some(false);

    for (key, value) in args {
        let Some(field_schema) = properties.get(key) else {
            if closed {
                return Err(invalid(format!("unknown field: {key}")));
            }
            continue;
        };
        if let Some(type_name) = field_schema.get("type").and_then(Value::as_str) {
            if !value_matches_type(value, type_name) {
                return Err(invalid(format!("field '{key}' must be of type {type_name}")));
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, type_name: &str) -> bool {
    match type_name {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}
