//! Model gateway errors.

/// Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by a model or while resolving one.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A `prefix/model` name used a prefix no provider is registered for.
    #[error("Unknown model provider prefix: {prefix}")]
    UnknownProvider {
        /// The unrecognised prefix.
        prefix: String,
    },

    /// Credentials were missing or rejected.
    #[error("Auth error: {message}")]
    Auth {
        /// Error description.
        message: String,
    },

    /// The provider throttled the request.
    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested delay.
        retry_after_ms: u64,
        /// Error description.
        message: String,
    },

    /// The provider returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// Status code.
        status: u16,
        /// Error description.
        message: String,
        /// Provider-specific error code.
        code: Option<String>,
        /// Whether the request may be retried.
        retryable: bool,
    },

    /// A streamed response ended without a completed response.
    #[error("Stream error: {message}")]
    Stream {
        /// Error description.
        message: String,
    },

    /// Payload (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The call was cancelled.
    #[error("Model call cancelled")]
    Cancelled,

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl ModelError {
    /// Shorthand for [`ModelError::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Whether the failure is caused by caller configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnknownProvider { .. })
    }

    /// Whether a caller-level retry could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { retryable, .. } => *retryable,
            Self::UnknownProvider { .. }
            | Self::Auth { .. }
            | Self::Stream { .. }
            | Self::Json(_)
            | Self::Cancelled
            | Self::Other { .. } => false,
        }
    }

    /// Error category string for log fields.
    pub fn category(&self) -> &str {
        match self {
            Self::UnknownProvider { .. } => "configuration",
            Self::Auth { .. } => "auth",
            Self::RateLimited { .. } => "rate_limit",
            Self::Api { .. } => "api",
            Self::Stream { .. } | Self::Json(_) => "parse",
            Self::Cancelled => "cancelled",
            Self::Other { .. } => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_display() {
        let err = ModelError::UnknownProvider {
            prefix: "acme".into(),
        };
        assert_eq!(err.to_string(), "Unknown model provider prefix: acme");
        assert!(err.is_configuration());
        assert!(!err.is_retryable());
    }

    #[test]
    fn retryable_classification() {
        assert!(
            ModelError::RateLimited {
                retry_after_ms: 100,
                message: "slow down".into()
            }
            .is_retryable()
        );
        assert!(
            ModelError::Api {
                status: 503,
                message: "overloaded".into(),
                code: None,
                retryable: true
            }
            .is_retryable()
        );
        assert!(!ModelError::Cancelled.is_retryable());
        assert!(!ModelError::other("boom").is_retryable());
    }

    #[test]
    fn categories() {
        assert_eq!(ModelError::Cancelled.category(), "cancelled");
        assert_eq!(
            ModelError::Stream {
                message: "eof".into()
            }
            .category(),
            "parse"
        );
        assert_eq!(
            ModelError::Auth {
                message: "no key".into()
            }
            .category(),
            "auth"
        );
    }
}
