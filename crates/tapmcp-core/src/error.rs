//! Adapter error taxonomy.
//!
//! Argument and routing failures are reported at the protocol layer; tool
//! execution failures are delivered as failed tool results.

use thiserror::Error;

pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Not authorized")]
    AuthenticationFailed,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("TM is not healthy")]
    BackendUnhealthy,

    #[error("Tool '{tool}' requires argument '{argument}'")]
    MissingRequiredArgument { tool: String, argument: String },

    #[error("Connection id is required")]
    MissingConnectionId,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Method not found: {0}")]
    UnsupportedMethod(String),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    #[error("Prompt argument '{0}' is required")]
    MissingArgument(String),

    #[error("Access to system collection '{0}' is not allowed")]
    AccessDenied(String),

    #[error("Invalid filter format: {0}")]
    InvalidFilterFormat(String),

    #[error("Pipeline must be an array of stage objects")]
    PipelineNotArray,

    #[error("Invalid argument '{argument}': {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("Error executing {tool} on '{target}': {message}")]
    QueryExecution {
        tool: String,
        target: String,
        message: String,
    },

    #[error("Backend request failed: {0}")]
    Backend(String),
}

impl AdapterError {
    /// True for argument validation and routing failures, which fail the
    /// protocol call instead of producing a failed tool result.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_)
                | Self::MissingRequiredArgument { .. }
                | Self::MissingConnectionId
                | Self::UnknownTool(_)
                | Self::UnsupportedMethod(_)
                | Self::UnknownPrompt(_)
                | Self::MissingArgument(_)
                | Self::InvalidFilterFormat(_)
                | Self::PipelineNotArray
                | Self::InvalidArgument { .. }
        )
    }

    pub fn missing(tool: &str, argument: &str) -> Self {
        Self::MissingRequiredArgument {
            tool: tool.to_string(),
            argument: argument.to_string(),
        }
    }

    pub fn invalid(argument: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.to_string(),
            reason: reason.into(),
        }
    }

    /// Wrap a driver or backend failure raised while a tool was running.
    pub fn query_execution(tool: &str, target: &str, err: impl std::fmt::Display) -> Self {
        Self::QueryExecution {
            tool: tool.to_string(),
            target: target.to_string(),
            message: format!("{:#}", err),
        }
    }
}
