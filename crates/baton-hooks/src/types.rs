//! Hook event payloads.

use baton_core::ModelResponse;
use serde::Serialize;
use serde_json::Value;

/// A lifecycle point in a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HookEvent {
    /// An agent became active and is about to run its first turn.
    AgentStart {
        /// Agent name.
        agent: String,
    },
    /// An agent produced the run's final output.
    AgentEnd {
        /// Agent name.
        agent: String,
        /// Final output.
        output: Value,
    },
    /// Control moved between agents.
    Handoff {
        /// Agent handing off.
        from: String,
        /// Agent taking over.
        to: String,
    },
    /// A tool is about to run.
    ToolStart {
        /// Agent whose turn issued the call.
        agent: String,
        /// Tool name.
        tool_name: String,
        /// Call id.
        call_id: String,
    },
    /// A tool finished.
    ToolEnd {
        /// Agent whose turn issued the call.
        agent: String,
        /// Tool name.
        tool_name: String,
        /// Call id.
        call_id: String,
        /// Transcript text of the result.
        output: String,
    },
    /// A model call is about to start.
    LlmStart {
        /// Agent name.
        agent: String,
        /// Resolved system instructions.
        system_prompt: Option<String>,
        /// Transcript length sent.
        input_items: usize,
    },
    /// A model call returned.
    LlmEnd {
        /// Agent name.
        agent: String,
        /// The response.
        response: ModelResponse,
    },
}

impl HookEvent {
    /// Event kind, e.g. `tool_start`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AgentStart { .. } => "agent_start",
            Self::AgentEnd { .. } => "agent_end",
            Self::Handoff { .. } => "handoff",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::LlmStart { .. } => "llm_start",
            Self::LlmEnd { .. } => "llm_end",
        }
    }

    /// Agent the event concerns. For handoffs, the receiving agent.
    pub fn agent(&self) -> &str {
        match self {
            Self::AgentStart { agent }
            | Self::AgentEnd { agent, .. }
            | Self::ToolStart { agent, .. }
            | Self::ToolEnd { agent, .. }
            | Self::LlmStart { agent, .. }
            | Self::LlmEnd { agent, .. } => agent,
            Self::Handoff { to, .. } => to,
        }
    }
}
