use thiserror::Error;

use crate::tool::SchemaError;

/// Problems with the agent set handed to a run, detected before any request
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("No agents provided")]
    NoAgents,

    #[error("Duplicate agent name: {0}")]
    DuplicateAgent(String),
}

/// Failures translating a tool call into work. These abort the run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Could not interpret arguments for tool call {id} ({name}): {source}")]
    InvalidArguments {
        id: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Tool call {id} to agent {agent} has no input argument")]
    MissingInput { id: String, agent: String },
}

/// A failure inside a tool an agent invoked. Never leaves the engine: it is
/// logged and replaced with [`TOOL_ERROR_MESSAGE`] in the transcript.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool returned no result")]
    NoResult,

    #[error("Tool execution failed: {0}")]
    ExecutionError(#[from] anyhow::Error),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// The text that replaces any tool failure in the conversation
pub const TOOL_ERROR_MESSAGE: &str = "An internal error occurred. Please try again later.";

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SwarmError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The chat API call failed; the run is abandoned with no partial result
    #[error("Provider request failed: {0:#}")]
    Transport(#[source] anyhow::Error),
}

pub type SwarmResult<T> = Result<T, SwarmError>;
