//! Hook error types.

use thiserror::Error;

/// Errors returned by hook handlers.
#[derive(Debug, Error)]
pub enum HookError {
    /// A handler failed.
    #[error("Hook handler error in '{name}': {message}")]
    Handler {
        /// Handler name.
        name: String,
        /// Failure description.
        message: String,
    },
}

impl HookError {
    /// Build a handler error.
    pub fn handler(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_display() {
        let err = HookError::handler("audit", "disk full");
        assert_eq!(err.to_string(), "Hook handler error in 'audit': disk full");
    }
}
