//! Tool error types.

use thiserror::Error;

/// Errors raised while assembling or invoking tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match the tool's schema.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the mismatch.
        message: String,
    },

    /// The tool ran and failed.
    #[error("{message}")]
    Execution {
        /// Failure description.
        message: String,
    },

    /// The tool exceeded its time limit.
    #[error("timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured limit.
        timeout_ms: u64,
    },

    /// The run was cancelled while the tool was in flight.
    #[error("cancelled")]
    Cancelled,

    /// Two tool sources expose the same name.
    #[error("duplicate tool name {name:?} (from {first} and {second})")]
    DuplicateName {
        /// Colliding name.
        name: String,
        /// First source.
        first: String,
        /// Second source.
        second: String,
    },

    /// Tool set misconfiguration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description.
        message: String,
    },

    /// A computer action's safety check was not acknowledged.
    #[error("safety check {check_id} ({code}) was rejected")]
    SafetyCheckRejected {
        /// Check id.
        check_id: String,
        /// Check code.
        code: String,
    },

    /// A remote tool server failed.
    #[error("server {server}: {message}")]
    Server {
        /// Server name.
        server: String,
        /// Failure description.
        message: String,
    },

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolError {
    /// Shorthand for [`ToolError::Execution`].
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// Whether the failure is caused by caller configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName { .. } | Self::Configuration { .. } | Self::SafetyCheckRejected { .. }
        )
    }

    /// Error category string for log fields.
    pub fn category(&self) -> &str {
        match self {
            Self::Validation { .. } | Self::Json(_) => "validation",
            Self::Execution { .. } => "execution",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::DuplicateName { .. } | Self::Configuration { .. } => "configuration",
            Self::SafetyCheckRejected { .. } => "safety",
            Self::Server { .. } => "server",
        }
    }
}
