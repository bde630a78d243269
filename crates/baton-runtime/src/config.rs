//! Per-run configuration.

use std::fmt;
use std::sync::Arc;

use baton_guardrails::{InputGuardrail, OutputGuardrail};
use baton_hooks::LifecycleHooks;
use baton_llm::{Model, ModelProvider, ModelSettings};
use baton_settings::BatonSettings;
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentModel};
use crate::errors::RunError;
use crate::handoff::HandoffInputFilter;
use crate::turn::ToolUseBehavior;

/// Compiled default turn budget.
pub const DEFAULT_MAX_TURNS: u32 = 10;

/// Compiled default workflow name.
pub const DEFAULT_WORKFLOW_NAME: &str = "Agent workflow";

/// Settings for one `run` call. Values set here override the agent's.
#[derive(Clone)]
pub struct RunConfig {
    /// Model for every agent, overriding theirs.
    pub model: Option<AgentModel>,
    /// Resolves model names.
    pub model_provider: Option<Arc<dyn ModelProvider>>,
    /// Overlaid on each agent's model settings.
    pub model_settings: Option<ModelSettings>,
    /// Transcript filter for handoffs that declare none.
    pub handoff_input_filter: Option<HandoffInputFilter>,
    /// Checked on the run input alongside the starting agent's.
    pub input_guardrails: Vec<Arc<dyn InputGuardrail>>,
    /// Checked on the final output alongside the final agent's.
    pub output_guardrails: Vec<Arc<dyn OutputGuardrail>>,
    /// Emit no spans.
    pub tracing_disabled: bool,
    /// Record tool inputs and outputs on spans.
    pub trace_include_sensitive_data: bool,
    /// Name of the `workflow` span.
    pub workflow_name: String,
    /// Trace id; generated when unset.
    pub trace_id: Option<String>,
    /// Links traces from one conversation.
    pub group_id: Option<String>,
    /// Turn budget.
    pub max_turns: u32,
    /// Overrides every agent's tool use behavior.
    pub tool_use_behavior: Option<ToolUseBehavior>,
    /// Forwarded to the model as a preference.
    pub parallel_tool_calls: Option<bool>,
    /// Overrides every agent's reset-tool-choice flag.
    pub reset_tool_choice: Option<bool>,
    /// Provider continuity token for the first turn.
    pub previous_response_id: Option<String>,
    /// Run-scoped lifecycle hooks.
    pub hooks: Option<Arc<dyn LifecycleHooks>>,
    /// Cancels the run at its next suspension point.
    pub cancellation: CancellationToken,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: None,
            model_provider: None,
            model_settings: None,
            handoff_input_filter: None,
            input_guardrails: Vec::new(),
            output_guardrails: Vec::new(),
            tracing_disabled: false,
            trace_include_sensitive_data: true,
            workflow_name: DEFAULT_WORKFLOW_NAME.to_owned(),
            trace_id: None,
            group_id: None,
            max_turns: DEFAULT_MAX_TURNS,
            tool_use_behavior: None,
            parallel_tool_calls: None,
            reset_tool_choice: None,
            previous_response_id: None,
            hooks: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl RunConfig {
    /// Config seeded from loaded settings.
    pub fn from_settings(settings: &BatonSettings) -> Self {
        let runner = &settings.runner;
        Self {
            max_turns: runner.max_turns,
            tracing_disabled: runner.tracing_disabled,
            trace_include_sensitive_data: runner.trace_include_sensitive_data,
            workflow_name: runner.workflow_name.clone(),
            model: settings.model.default_model.clone().map(AgentModel::Name),
            ..Self::default()
        }
    }

    /// Set the turn budget.
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Use `model` for every agent.
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn Model>) -> Self {
        self.model = Some(AgentModel::Instance(model));
        self
    }

    /// Resolve `name` through the provider for every agent.
    #[must_use]
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model = Some(AgentModel::Name(name.into()));
        self
    }

    /// Model name resolver.
    #[must_use]
    pub fn with_model_provider(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.model_provider = Some(provider);
        self
    }

    /// Model settings overlay.
    #[must_use]
    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = Some(settings);
        self
    }

    /// Fallback handoff filter.
    #[must_use]
    pub fn with_handoff_input_filter(mut self, filter: HandoffInputFilter) -> Self {
        self.handoff_input_filter = Some(filter);
        self
    }

    /// Add a run-level input guardrail.
    #[must_use]
    pub fn with_input_guardrail(mut self, guardrail: Arc<dyn InputGuardrail>) -> Self {
        self.input_guardrails.push(guardrail);
        self
    }

    /// Add a run-level output guardrail.
    #[must_use]
    pub fn with_output_guardrail(mut self, guardrail: Arc<dyn OutputGuardrail>) -> Self {
        self.output_guardrails.push(guardrail);
        self
    }

    /// Turn spans off.
    #[must_use]
    pub fn with_tracing_disabled(mut self, disabled: bool) -> Self {
        self.tracing_disabled = disabled;
        self
    }

    /// Whether spans may carry tool inputs and outputs.
    #[must_use]
    pub fn with_trace_include_sensitive_data(mut self, include: bool) -> Self {
        self.trace_include_sensitive_data = include;
        self
    }

    /// Workflow name.
    #[must_use]
    pub fn with_workflow_name(mut self, name: impl Into<String>) -> Self {
        self.workflow_name = name.into();
        self
    }

    /// Explicit trace id.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Trace group id.
    #[must_use]
    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Tool use behavior for every agent.
    #[must_use]
    pub fn with_tool_use_behavior(mut self, behavior: ToolUseBehavior) -> Self {
        self.tool_use_behavior = Some(behavior);
        self
    }

    /// Parallel tool call preference.
    #[must_use]
    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = Some(parallel);
        self
    }

    /// Reset-tool-choice flag for every agent.
    #[must_use]
    pub fn with_reset_tool_choice(mut self, reset: bool) -> Self {
        self.reset_tool_choice = Some(reset);
        self
    }

    /// Continuity token for the first turn.
    #[must_use]
    pub fn with_previous_response_id(mut self, id: impl Into<String>) -> Self {
        self.previous_response_id = Some(id.into());
        self
    }

    /// Run-scoped hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn LifecycleHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Cancellation signal.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Model for `agent` on `turn`: the run's model wins over the agent's.
    pub fn resolve_model(&self, agent: &Agent, turn: u32) -> Result<Arc<dyn Model>, RunError> {
        let selected = self.model.as_ref().or(agent.model());
        if let Some(AgentModel::Instance(model)) = selected {
            return Ok(Arc::clone(model));
        }
        let name = match selected {
            Some(AgentModel::Name(name)) => Some(name.as_str()),
            _ => None,
        };
        let provider = self.model_provider.as_ref().ok_or_else(|| {
            RunError::user(format!(
                "agent {} has no model instance and the run has no model provider",
                agent.name()
            ))
        })?;
        provider
            .get_model(name)
            .map_err(|e| RunError::from_model(turn, agent.name(), e))
    }

    /// Tool use behavior for `agent`.
    pub fn tool_use_behavior_for<'a>(&'a self, agent: &'a Agent) -> &'a ToolUseBehavior {
        self.tool_use_behavior.as_ref().unwrap_or(agent.tool_use_behavior())
    }

    /// Reset-tool-choice flag for `agent`.
    pub fn reset_tool_choice_for(&self, agent: &Agent) -> bool {
        self.reset_tool_choice.unwrap_or(agent.reset_tool_choice())
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("model", &self.model)
            .field("max_turns", &self.max_turns)
            .field("workflow_name", &self.workflow_name)
            .field("tracing_disabled", &self.tracing_disabled)
            .field("tool_use_behavior", &self.tool_use_behavior)
            .field("parallel_tool_calls", &self.parallel_tool_calls)
            .field("reset_tool_choice", &self.reset_tool_choice)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use baton_llm::testing::ScriptedModel;
    use baton_llm::{FnModelProvider, ModelError, MultiProvider};

    fn provider() -> Arc<dyn ModelProvider> {
        let default: Arc<dyn ModelProvider> =
            Arc::new(FnModelProvider::new(|name: &str, _defaults: &baton_llm::ProviderDefaults| {
                Ok(Arc::new(ScriptedModel::named(name)) as Arc<dyn Model>)
            }));
        Arc::new(MultiProvider::new(Arc::clone(&default)).with_provider("acme", default))
    }

    #[test]
    fn defaults() {
        let config = RunConfig::default();
        assert_eq!(config.max_turns, 10);
        assert_eq!(config.workflow_name, "Agent workflow");
        assert!(config.trace_include_sensitive_data);
        assert!(!config.cancellation.is_cancelled());
    }

    #[test]
    fn from_settings_applies_runner_section() {
        let mut settings = BatonSettings::default();
        settings.runner.max_turns = 3;
        settings.runner.tracing_disabled = true;
        settings.model.default_model = Some("acme/large".into());
        let config = RunConfig::from_settings(&settings);
        assert_eq!(config.max_turns, 3);
        assert!(config.tracing_disabled);
        assert_matches!(config.model, Some(AgentModel::Name(ref n)) if n == "acme/large");
    }

    #[test]
    fn run_model_overrides_agent_model() {
        let agent = Agent::new("a").with_model_instance(Arc::new(ScriptedModel::named("agent-model")));
        let config = RunConfig::default().with_model(Arc::new(ScriptedModel::named("run-model")));
        assert_eq!(config.resolve_model(&agent, 1).unwrap().name(), "run-model");
        assert_eq!(RunConfig::default().resolve_model(&agent, 1).unwrap().name(), "agent-model");
    }

    #[test]
    fn names_go_through_provider() {
        let agent = Agent::new("a").with_model("acme/large");
        let config = RunConfig::default().with_model_provider(provider());
        assert_eq!(config.resolve_model(&agent, 1).unwrap().name(), "large");

        let unknown = Agent::new("a").with_model("nope/large");
        assert_matches!(config.resolve_model(&unknown, 1).err(), Some(RunError::User { ref message }) if message.contains("nope"));
    }

    #[test]
    fn run_model_name_resolves_for_every_agent() {
        let agent = Agent::new("a").with_model_instance(Arc::new(ScriptedModel::named("agent-model")));
        let config = RunConfig::default()
            .with_model_provider(provider())
            .with_model_name("acme/large");
        assert_eq!(config.resolve_model(&agent, 1).unwrap().name(), "large");
    }

    #[test]
    fn missing_provider_is_user_error() {
        let err = RunConfig::default().resolve_model(&Agent::new("a"), 1).err();
        assert_matches!(err, Some(RunError::User { .. }));
    }

    #[test]
    fn provider_failures_keep_model_context() {
        struct Broken;
        impl ModelProvider for Broken {
            fn get_model(&self, _name: Option<&str>) -> baton_llm::ModelResult<Arc<dyn Model>> {
                Err(ModelError::Auth {
                    message: "no key".into(),
                })
            }
        }
        let config = RunConfig::default().with_model_provider(Arc::new(Broken));
        assert_matches!(config.resolve_model(&Agent::new("a"), 1).err(), Some(RunError::Model { .. }));
    }

    #[test]
    fn overrides_fall_back_to_agent() {
        let agent = Agent::new("a")
            .with_reset_tool_choice(false)
            .with_tool_use_behavior(ToolUseBehavior::StopOnFirstTool);
        let config = RunConfig::default();
        assert!(!config.reset_tool_choice_for(&agent));
        assert_matches!(config.tool_use_behavior_for(&agent), ToolUseBehavior::StopOnFirstTool);

        let config = config
            .with_reset_tool_choice(true)
            .with_tool_use_behavior(ToolUseBehavior::RunLlmAgain);
        assert!(config.reset_tool_choice_for(&agent));
        assert_matches!(config.tool_use_behavior_for(&agent), ToolUseBehavior::RunLlmAgain);
    }
}
