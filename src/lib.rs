//! Paged photo-library search and interchangeable chat backends.
//!
//! - `PagedSearchClient` walks continuation tokens over any `SearchService`,
//!   with `GooglePhotosService` as the HTTP implementation
//! - `ChatBackend` with echo, hosted-model and tool-agent implementations
//! - `Agent` tool-calling loop with conversation memory
//! - OpenAI chat completions adapter via `OpenAiModel`

pub mod agent;
pub mod chat;
pub mod error;
pub mod llm;
pub mod photos;
pub mod tools;

pub use agent::{Agent, AgentBuilder, AgentConfig, AgentEvent, ConversationRole, PreviousMessage};
pub use chat::{
    AgentBackend, BackendKind, ChatBackend, ChatResponse, ChatRole, EchoBackend,
    HostedModelBackend, backend_from_env,
};
pub use error::{
    AgentError, ChatError, ProviderError, SchemaError, SearchError, ServiceError, ToolError,
};
pub use llm::{
    ChatModel, ModelCompletion, ModelMessage, ModelToolCall, ModelToolDefinition, OpenAiModel,
    OpenAiModelConfig,
};
pub use photos::{
    FilterDate, GooglePhotosConfig, GooglePhotosService, MediaItem, Page, PageRequest,
    PagedSearchClient, SearchFilter, SearchService,
};
pub use tools::ToolSpec;
