pub mod agent;
pub mod errors;
pub mod models;
pub mod providers;
pub mod swarm;
pub mod tool;
pub mod transcript;

pub use agent::{Agent, AgentBuilder, AgentSpec};
pub use errors::{ConfigError, DispatchError, SwarmError, SwarmResult, ToolError, TOOL_ERROR_MESSAGE};
pub use models::message::{Message, ToolCall};
pub use models::role::Role;
pub use swarm::{RunOutput, RunRequest, StopReason, Swarm, DEFAULT_MAX_TURNS};
pub use transcript::TranscriptError;
pub use tool::{AgentTool, FunctionTool, Parameter, ParameterType, SchemaError, ToolSchema};
pub use providers::base::{Provider, Usage};
pub use providers::configs::OpenAiProviderConfig;
pub use providers::openai::OpenAiProvider;
