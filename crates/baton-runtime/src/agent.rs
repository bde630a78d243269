//! Agent configuration.
//!
//! An [`Agent`] is immutable once built. The run loop never mutates it; it
//! only swaps which agent is active. Agents are shared as `Arc<Agent>`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use baton_core::RunContext;
use baton_guardrails::{InputGuardrail, OutputGuardrail};
use baton_hooks::LifecycleHooks;
use baton_llm::{Model, ModelSettings, Prompt};
use baton_tools::{FunctionTool, McpServer, Tool};
use futures::future::BoxFuture;

use crate::agent_tool::AgentTool;
use crate::config::RunConfig;
use crate::handoff::{Handoff, handoff};
use crate::output::OutputType;
use crate::turn::ToolUseBehavior;

type DynamicInstructionsFn = Arc<dyn Fn(RunContext, String) -> BoxFuture<'static, String> + Send + Sync>;

/// Where an agent's system instructions come from.
#[derive(Clone)]
pub enum Instructions {
    /// Fixed text.
    Static(String),
    /// Computed once per turn from the run context and agent name.
    Dynamic(DynamicInstructionsFn),
    /// A stored prompt object forwarded to the model.
    Prompt(Prompt),
}

impl fmt::Debug for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic"),
            Self::Prompt(prompt) => f.debug_tuple("Prompt").field(&prompt.id).finish(),
        }
    }
}

/// Which model an agent (or a run) uses.
#[derive(Clone)]
pub enum AgentModel {
    /// Resolved through the run's model provider, e.g. `"acme/large"`.
    Name(String),
    /// A ready model.
    Instance(Arc<dyn Model>),
}

impl fmt::Debug for AgentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Self::Instance(model) => f.debug_tuple("Instance").field(&model.name()).finish(),
        }
    }
}

/// An LLM-driven agent.
#[derive(Clone)]
pub struct Agent {
    name: String,
    handoff_description: Option<String>,
    instructions: Option<Instructions>,
    model: Option<AgentModel>,
    model_settings: ModelSettings,
    tools: Vec<Tool>,
    mcp_servers: Vec<Arc<dyn McpServer>>,
    handoffs: Vec<Handoff>,
    input_guardrails: Vec<Arc<dyn InputGuardrail>>,
    output_guardrails: Vec<Arc<dyn OutputGuardrail>>,
    output_type: OutputType,
    tool_use_behavior: ToolUseBehavior,
    reset_tool_choice: bool,
    hooks: Option<Arc<dyn LifecycleHooks>>,
}

impl Agent {
    /// An agent with no instructions, tools or handoffs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handoff_description: None,
            instructions: None,
            model: None,
            model_settings: ModelSettings::default(),
            tools: Vec::new(),
            mcp_servers: Vec::new(),
            handoffs: Vec::new(),
            input_guardrails: Vec::new(),
            output_guardrails: Vec::new(),
            output_type: OutputType::Text,
            tool_use_behavior: ToolUseBehavior::RunLlmAgain,
            reset_tool_choice: true,
            hooks: None,
        }
    }

    /// Wrap in an `Arc`.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    // ── Builders ────────────────────────────────────────────────────

    /// Static system instructions.
    #[must_use]
    pub fn with_instructions(mut self, text: impl Into<String>) -> Self {
        self.instructions = Some(Instructions::Static(text.into()));
        self
    }

    /// Instructions computed every turn.
    #[must_use]
    pub fn with_dynamic_instructions<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RunContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        self.instructions = Some(Instructions::Dynamic(Arc::new(move |ctx, agent| Box::pin(f(ctx, agent)))));
        self
    }

    /// A stored prompt object instead of instructions.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Prompt) -> Self {
        self.instructions = Some(Instructions::Prompt(prompt));
        self
    }

    /// Text shown to other agents' models when this agent is a handoff target.
    #[must_use]
    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    /// Model name, resolved through the run's provider.
    #[must_use]
    pub fn with_model(mut self, name: impl Into<String>) -> Self {
        self.model = Some(AgentModel::Name(name.into()));
        self
    }

    /// A ready model instance.
    #[must_use]
    pub fn with_model_instance(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(AgentModel::Instance(model));
        self
    }

    /// Model tuning.
    #[must_use]
    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    /// Declare a tool.
    #[must_use]
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// Declare a function tool.
    #[must_use]
    pub fn with_function_tool(self, tool: impl FunctionTool + 'static) -> Self {
        self.with_tool(Tool::function(tool))
    }

    /// Attach a remote tool server. Its tools are listed every turn.
    #[must_use]
    pub fn with_mcp_server(mut self, server: Arc<dyn McpServer>) -> Self {
        self.mcp_servers.push(server);
        self
    }

    /// Allow handing off to `agent` with a generated descriptor.
    #[must_use]
    pub fn with_handoff_agent(mut self, agent: Arc<Agent>) -> Self {
        self.handoffs.push(handoff(agent));
        self
    }

    /// Allow a handoff through an explicit descriptor.
    #[must_use]
    pub fn with_handoff(mut self, handoff: Handoff) -> Self {
        self.handoffs.push(handoff);
        self
    }

    /// Add an input guardrail (checked only when this agent starts a run).
    #[must_use]
    pub fn with_input_guardrail(mut self, guardrail: Arc<dyn InputGuardrail>) -> Self {
        self.input_guardrails.push(guardrail);
        self
    }

    /// Add an output guardrail (checked when this agent produces the final output).
    #[must_use]
    pub fn with_output_guardrail(mut self, guardrail: Arc<dyn OutputGuardrail>) -> Self {
        self.output_guardrails.push(guardrail);
        self
    }

    /// Constrain the final output.
    #[must_use]
    pub fn with_output_type(mut self, output_type: OutputType) -> Self {
        self.output_type = output_type;
        self
    }

    /// What happens after tools run.
    #[must_use]
    pub fn with_tool_use_behavior(mut self, behavior: ToolUseBehavior) -> Self {
        self.tool_use_behavior = behavior;
        self
    }

    /// Whether a forced tool choice is cleared once this agent has used a tool.
    #[must_use]
    pub fn with_reset_tool_choice(mut self, reset: bool) -> Self {
        self.reset_tool_choice = reset;
        self
    }

    /// Agent-scoped lifecycle hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Agent name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handoff description.
    pub fn handoff_description(&self) -> Option<&str> {
        self.handoff_description.as_deref()
    }

    /// Instructions source.
    pub fn instructions(&self) -> Option<&Instructions> {
        self.instructions.as_ref()
    }

    /// Model selection.
    pub fn model(&self) -> Option<&AgentModel> {
        self.model.as_ref()
    }

    /// Model tuning.
    pub fn model_settings(&self) -> &ModelSettings {
        &self.model_settings
    }

    /// Declared tools.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Remote tool servers.
    pub fn mcp_servers(&self) -> &[Arc<dyn McpServer>] {
        &self.mcp_servers
    }

    /// Declared handoffs, enabled or not.
    pub fn handoffs(&self) -> &[Handoff] {
        &self.handoffs
    }

    /// Handoffs visible to the model on this turn.
    pub fn enabled_handoffs(&self, ctx: &RunContext) -> Vec<Handoff> {
        self.handoffs
            .iter()
            .filter(|h| h.is_enabled(ctx, self))
            .cloned()
            .collect()
    }

    /// Input guardrails.
    pub fn input_guardrails(&self) -> &[Arc<dyn InputGuardrail>] {
        &self.input_guardrails
    }

    /// Output guardrails.
    pub fn output_guardrails(&self) -> &[Arc<dyn OutputGuardrail>] {
        &self.output_guardrails
    }

    /// Output constraint.
    pub fn output_type(&self) -> &OutputType {
        &self.output_type
    }

    /// Tool use policy.
    pub fn tool_use_behavior(&self) -> &ToolUseBehavior {
        &self.tool_use_behavior
    }

    /// Whether tool choice is reset after tool use.
    pub fn reset_tool_choice(&self) -> bool {
        self.reset_tool_choice
    }

    /// Agent-scoped hooks.
    pub fn hooks(&self) -> Option<&Arc<dyn LifecycleHooks>> {
        self.hooks.as_ref()
    }

    /// Resolve this turn's system instructions and prompt object.
    pub async fn resolve_instructions(&self, ctx: &RunContext) -> (Option<String>, Option<Prompt>) {
        match &self.instructions {
            None => (None, None),
            Some(Instructions::Static(text)) => (Some(text.clone()), None),
            Some(Instructions::Dynamic(f)) => (Some(f(ctx.clone(), self.name.clone()).await), None),
            Some(Instructions::Prompt(prompt)) => (None, Some(prompt.clone())),
        }
    }

    /// Expose this agent as a function tool that runs it on `{"input": ...}`.
    pub fn as_tool(
        self: &Arc<Self>,
        tool_name: impl Into<String>,
        tool_description: impl Into<String>,
        config: RunConfig,
    ) -> Tool {
        Tool::function(AgentTool::new(
            Arc::clone(self),
            tool_name.into(),
            tool_description.into(),
            config,
        ))
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tools: Vec<&str> = self.tools.iter().map(Tool::name).collect();
        let handoffs: Vec<&str> = self.handoffs.iter().map(Handoff::tool_name).collect();
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tools", &tools)
            .field("mcp_servers", &self.mcp_servers.len())
            .field("handoffs", &handoffs)
            .field("output_type", &self.output_type.label())
            .field("tool_use_behavior", &self.tool_use_behavior)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[tokio::test]
    async fn static_instructions() {
        let agent = Agent::new("a").with_instructions("Be brief.");
        let (system, prompt) = agent.resolve_instructions(&RunContext::empty()).await;
        assert_eq!(system.as_deref(), Some("Be brief."));
        assert!(prompt.is_none());
    }

    #[tokio::test]
    async fn dynamic_instructions_see_context_and_name() {
        let agent = Agent::new("helper").with_dynamic_instructions(|ctx, name| async move {
            let user = ctx.get::<&'static str>().copied().unwrap_or("anon");
            format!("{name} serving {user}")
        });
        let (system, _) = agent.resolve_instructions(&RunContext::new("ada")).await;
        assert_eq!(system.as_deref(), Some("helper serving ada"));
    }

    #[tokio::test]
    async fn prompt_objects_are_forwarded() {
        let agent = Agent::new("a").with_prompt(Prompt {
            id: "pmpt_1".into(),
            version: Some("2".into()),
            variables: Map::new(),
        });
        let (system, prompt) = agent.resolve_instructions(&RunContext::empty()).await;
        assert!(system.is_none());
        assert_eq!(prompt.unwrap().id, "pmpt_1");
    }

    #[test]
    fn handoff_agents_become_descriptors() {
        let billing = Agent::new("Billing agent").shared();
        let triage = Agent::new("triage").with_handoff_agent(billing);
        assert_eq!(triage.handoffs()[0].tool_name(), "transfer_to_billing_agent");
        assert_eq!(triage.enabled_handoffs(&RunContext::empty()).len(), 1);
    }

    #[test]
    fn defaults() {
        let agent = Agent::new("a");
        assert!(agent.reset_tool_choice());
        assert!(agent.output_type().is_plain_text());
        assert!(agent.hooks().is_none());
        assert!(format!("{agent:?}").contains("\"a\""));
    }
}
