use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors local to a single tool-call iteration. These are values that travel
/// inside conversation messages (so the model can see and recover from them),
/// which is why they are cloneable and serializable.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
