//! Error types for tern-core
//!
//! Tool-level errors never cross the handler boundary as `Err`: handlers fold
//! them into result strings for the model. This taxonomy exists for the
//! orchestrator surface, the host-facing log, and the remediation hints.

use thiserror::Error;

use crate::names::{ParamName, ToolName};

/// Result type alias using tern-core CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur during agent operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// An error from the model provider layer
    #[error(transparent)]
    Api(#[from] tern_model::ApiError),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("permission denied: {0}")]
    FilePermission(String),

    #[error("failed to read {path}: {reason}")]
    FileRead { path: String, reason: String },

    #[error("failed to write {path}: {reason}")]
    FileWrite { path: String, reason: String },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command timed out after {0} seconds")]
    CommandTimeout(u64),

    #[error("command exited with code {0}")]
    CommandExit(i32),

    #[error("missing required parameter '{param}' for tool '{tool}'")]
    MissingParameter { tool: ToolName, param: ParamName },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Access denied: {0}")]
    PathDenied(String),

    #[error("Command blocked: {0}")]
    CommandDenied(String),

    #[error("missing configuration: {0}")]
    ConfigMissing(String),

    #[error("malformed configuration: {0}")]
    ConfigMalformed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Unknown(String),
}

impl CoreError {
    /// Whether this is a security rejection that must halt the tool with no
    /// side effects.
    pub fn is_security(&self) -> bool {
        matches!(self, CoreError::PathDenied(_) | CoreError::CommandDenied(_))
    }

    /// One-line remediation hint from the fixed table
    pub fn hint(&self) -> &'static str {
        match self {
            CoreError::Api(e) => e.hint(),
            CoreError::FileNotFound(_) => "check the path and try again",
            CoreError::FilePermission(_) => "check file permissions",
            CoreError::FileRead { .. } | CoreError::FileWrite { .. } => {
                "verify the file is accessible"
            }
            CoreError::CommandNotFound(_) => "install the command or fix the name",
            CoreError::CommandTimeout(_) => "raise the timeout or simplify the command",
            CoreError::CommandExit(_) => "inspect the command output",
            CoreError::MissingParameter { .. } | CoreError::InvalidArgument(_) => {
                "retry with complete parameters"
            }
            CoreError::PathDenied(_) => "work inside the task directory",
            CoreError::CommandDenied(_) => "use a safer command",
            CoreError::ConfigMissing(_) => "run `tern config set` to provide it",
            CoreError::ConfigMalformed(_) => "fix the config file syntax",
            CoreError::Network(_) => "check network connectivity",
            CoreError::Unknown(_) => "retry; report if it persists",
        }
    }

    /// Short kind label for the structured log
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Api(_) => "api",
            CoreError::FileNotFound(_)
            | CoreError::FilePermission(_)
            | CoreError::FileRead { .. }
            | CoreError::FileWrite { .. } => "file",
            CoreError::CommandNotFound(_)
            | CoreError::CommandTimeout(_)
            | CoreError::CommandExit(_) => "command",
            CoreError::MissingParameter { .. } | CoreError::InvalidArgument(_) => "validation",
            CoreError::PathDenied(_) | CoreError::CommandDenied(_) => "security",
            CoreError::ConfigMissing(_) | CoreError::ConfigMalformed(_) => "config",
            CoreError::Network(_) => "network",
            CoreError::Unknown(_) => "unknown",
        }
    }
}
