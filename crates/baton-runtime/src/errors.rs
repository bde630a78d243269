//! Run error taxonomy.

use baton_guardrails::{GuardrailError, GuardrailTripwire};
use baton_hooks::HookError;
use baton_llm::ModelError;
use baton_tools::ToolError;

/// Why a run did not produce a final output.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Caller misconfiguration: duplicate tool names, two computer tools,
    /// unknown provider prefix, rejected safety check.
    #[error("User error: {message}")]
    User {
        /// Error description.
        message: String,
    },

    /// The model violated the declared contract: unknown tool or handoff,
    /// unparsable output, no usable output.
    #[error("Model behavior error: {message}")]
    ModelBehavior {
        /// Error description.
        message: String,
    },

    /// The turn budget ran out before a final output.
    #[error("Max turns ({max_turns}) exceeded")]
    MaxTurnsExceeded {
        /// Configured budget.
        max_turns: u32,
    },

    /// An input guardrail stopped the run before the first model call.
    #[error("Input guardrail {} triggered tripwire", .0.guardrail_name)]
    InputGuardrailTripwire(GuardrailTripwire),

    /// An output guardrail stopped the run before the result was returned.
    #[error("Output guardrail {} triggered tripwire", .0.guardrail_name)]
    OutputGuardrailTripwire(GuardrailTripwire),

    /// The model gateway failed.
    #[error("Model error on turn {turn} ({agent}): {source}")]
    Model {
        /// Turn of the failed call.
        turn: u32,
        /// Active agent.
        agent: String,
        /// Underlying error.
        #[source]
        source: ModelError,
    },

    /// A tool failed fatally.
    #[error("Tool {tool_name} failed on turn {turn} (call {call_id}): {source}")]
    Tool {
        /// Turn of the call.
        turn: u32,
        /// Tool name.
        tool_name: String,
        /// Call id.
        call_id: String,
        /// Underlying error.
        #[source]
        source: ToolError,
    },

    /// Assembling the turn's tool set failed (e.g. a tool server could not
    /// list its tools).
    #[error("Tool setup failed on turn {turn} ({agent}): {source}")]
    ToolSetup {
        /// Turn being prepared.
        turn: u32,
        /// Active agent.
        agent: String,
        /// Underlying error.
        #[source]
        source: ToolError,
    },

    /// A guardrail failed to evaluate.
    #[error("Guardrail {name} failed: {message}")]
    Guardrail {
        /// Guardrail name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// A lifecycle hook refused an event.
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),

    /// The caller cancelled the run.
    #[error("Run cancelled")]
    Cancelled,

    /// Internal fault, including a panic in a streamed run's task.
    #[error("Internal error: {message}")]
    Internal {
        /// Error description.
        message: String,
    },
}

/// Guardrail class that produced an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardrailStage {
    /// Checks on the run input.
    Input,
    /// Checks on the final output.
    Output,
}

impl RunError {
    /// Shorthand for [`RunError::User`].
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Shorthand for [`RunError::ModelBehavior`].
    pub fn model_behavior(message: impl Into<String>) -> Self {
        Self::ModelBehavior {
            message: message.into(),
        }
    }

    /// Shorthand for [`RunError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify a model gateway error raised on `turn`.
    pub fn from_model(turn: u32, agent: &str, source: ModelError) -> Self {
        match source {
            ModelError::Cancelled => Self::Cancelled,
            e if e.is_configuration() => Self::user(e.to_string()),
            source => Self::Model {
                turn,
                agent: agent.to_owned(),
                source,
            },
        }
    }

    /// Classify a fatal tool error raised by `tool_name` on `turn`.
    pub fn from_tool(turn: u32, tool_name: &str, call_id: &str, source: ToolError) -> Self {
        match source {
            ToolError::Cancelled => Self::Cancelled,
            e if e.is_configuration() => Self::user(e.to_string()),
            source => Self::Tool {
                turn,
                tool_name: tool_name.to_owned(),
                call_id: call_id.to_owned(),
                source,
            },
        }
    }

    /// Classify a guardrail error from `stage`.
    pub fn from_guardrail(stage: GuardrailStage, source: GuardrailError) -> Self {
        match (stage, source) {
            (GuardrailStage::Input, GuardrailError::Tripwire(t)) => Self::InputGuardrailTripwire(t),
            (GuardrailStage::Output, GuardrailError::Tripwire(t)) => Self::OutputGuardrailTripwire(t),
            (_, GuardrailError::Failed { name, message }) => Self::Guardrail { name, message },
        }
    }

    /// The tripped guardrail, for either tripwire variant.
    pub fn tripwire(&self) -> Option<&GuardrailTripwire> {
        match self {
            Self::InputGuardrailTripwire(t) | Self::OutputGuardrailTripwire(t) => Some(t),
            _ => None,
        }
    }

    /// Whether retrying the same run could succeed.
    ///
    /// Turn-budget exhaustion and transient gateway errors qualify; user
    /// errors, model-behavior errors and tripwires do not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MaxTurnsExceeded { .. } => true,
            Self::Model { source, .. } => source.is_retryable(),
            Self::User { .. }
            | Self::ModelBehavior { .. }
            | Self::InputGuardrailTripwire(_)
            | Self::OutputGuardrailTripwire(_)
            | Self::Tool { .. }
            | Self::ToolSetup { .. }
            | Self::Guardrail { .. }
            | Self::Hook(_)
            | Self::Cancelled
            | Self::Internal { .. } => false,
        }
    }

    /// Error category string for log fields.
    pub fn category(&self) -> &str {
        match self {
            Self::User { .. } => "user",
            Self::ModelBehavior { .. } => "model_behavior",
            Self::MaxTurnsExceeded { .. } => "max_turns",
            Self::InputGuardrailTripwire(_) => "input_guardrail_tripwire",
            Self::OutputGuardrailTripwire(_) => "output_guardrail_tripwire",
            Self::Model { .. } => "model",
            Self::Tool { .. } => "tool",
            Self::ToolSetup { .. } => "tool_setup",
            Self::Guardrail { .. } => "guardrail",
            Self::Hook(_) => "hook",
            Self::Cancelled => "cancelled",
            Self::Internal { .. } => "internal",
        }
    }
}
