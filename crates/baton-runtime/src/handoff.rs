//! Handoff descriptors.
//!
//! A handoff is exposed to the model as a function tool named
//! `transfer_to_<agent>`. Calling it runs the descriptor's transfer callback,
//! which yields the agent that takes over.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use baton_core::{HandoffSpec, InputItem, RunContext, RunItem};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::agent::Agent;
use crate::errors::RunError;

type OnInvokeFn = Arc<dyn Fn(RunContext, String) -> BoxFuture<'static, Result<Arc<Agent>, RunError>> + Send + Sync>;
type IsEnabledFn = Arc<dyn Fn(&RunContext, &Agent) -> bool + Send + Sync>;

/// Rewrites the transcript the next agent sees.
pub type HandoffInputFilter = Arc<dyn Fn(HandoffInputData) -> HandoffInputData + Send + Sync>;

/// Transcript split handed to a [`HandoffInputFilter`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandoffInputData {
    /// Items that preceded the current turn: the run input plus earlier turns.
    pub input_history: Vec<InputItem>,
    /// Items produced before the current turn.
    pub pre_handoff_items: Vec<RunItem>,
    /// Items produced by the current turn, including the handoff call and output.
    pub new_items: Vec<RunItem>,
}

/// Default tool name for handing off to `agent_name`.
pub fn default_tool_name(agent_name: &str) -> String {
    let snake: String = agent_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("transfer_to_{snake}")
}

/// Default tool description for handing off to `agent`.
pub fn default_tool_description(agent: &Agent) -> String {
    format!(
        "Handoff to the {} agent to handle the request. {}",
        agent.name(),
        agent.handoff_description().unwrap_or_default()
    )
    .trim_end()
    .to_owned()
}

fn empty_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false,
        "required": []
    })
}

/// A handoff the model may request.
#[derive(Clone)]
pub struct Handoff {
    tool_name: String,
    tool_description: String,
    input_json_schema: Value,
    strict: bool,
    agent_name: String,
    on_invoke: OnInvokeFn,
    input_filter: Option<HandoffInputFilter>,
    is_enabled: Option<IsEnabledFn>,
}

/// A handoff to `agent` with the generated tool name and description.
pub fn handoff(agent: Arc<Agent>) -> Handoff {
    let tool_name = default_tool_name(agent.name());
    let tool_description = default_tool_description(&agent);
    let agent_name = agent.name().to_owned();
    Handoff::new(tool_name, tool_description, agent_name, move |_ctx, _args| {
        let agent = Arc::clone(&agent);
        async move { Ok(agent) }
    })
}

impl Handoff {
    /// A handoff whose transfer callback decides the target agent.
    ///
    /// `agent_name` is the target's name as reported before the callback runs.
    pub fn new<F, Fut>(
        tool_name: impl Into<String>,
        tool_description: impl Into<String>,
        agent_name: impl Into<String>,
        on_invoke: F,
    ) -> Self
    where
        F: Fn(RunContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<Agent>, RunError>> + Send + 'static,
    {
        Self {
            tool_name: tool_name.into(),
            tool_description: tool_description.into(),
            input_json_schema: empty_input_schema(),
            strict: true,
            agent_name: agent_name.into(),
            on_invoke: Arc::new(move |ctx, args| Box::pin(on_invoke(ctx, args))),
            input_filter: None,
            is_enabled: None,
        }
    }

    /// Run `f` before transferring. An error aborts the run.
    #[must_use]
    pub fn with_on_handoff<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RunError>> + Send + 'static,
    {
        let f = Arc::new(f);
        let next = Arc::clone(&self.on_invoke);
        self.on_invoke = Arc::new(move |ctx, args| {
            let f = Arc::clone(&f);
            let next = Arc::clone(&next);
            Box::pin(async move {
                f(ctx.clone()).await?;
                next(ctx, args).await
            })
        });
        self
    }

    /// Require arguments matching `schema`, decoded into `T` and passed to `f`
    /// before transferring.
    #[must_use]
    pub fn with_input<T, F, Fut>(mut self, schema: Value, f: F) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(RunContext, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RunError>> + Send + 'static,
    {
        let f = Arc::new(f);
        let next = Arc::clone(&self.on_invoke);
        let tool_name = self.tool_name.clone();
        self.input_json_schema = schema;
        self.on_invoke = Arc::new(move |ctx, args| {
            let f = Arc::clone(&f);
            let next = Arc::clone(&next);
            let tool_name = tool_name.clone();
            Box::pin(async move {
                if args.trim().is_empty() {
                    return Err(RunError::model_behavior("Handoff function expected non-null input"));
                }
                let input: T = serde_json::from_str(&args).map_err(|e| {
                    RunError::model_behavior(format!("Invalid JSON input for handoff {tool_name}: {e}"))
                })?;
                f(ctx.clone(), input).await?;
                next(ctx, args).await
            })
        });
        self
    }

    /// Replace the generated tool name.
    #[must_use]
    pub fn tool_name_override(mut self, name: impl Into<String>) -> Self {
        self.tool_name = name.into();
        self
    }

    /// Replace the generated tool description.
    #[must_use]
    pub fn tool_description_override(mut self, description: impl Into<String>) -> Self {
        self.tool_description = description.into();
        self
    }

    /// Rewrite the transcript the target agent sees.
    #[must_use]
    pub fn with_input_filter(mut self, filter: HandoffInputFilter) -> Self {
        self.input_filter = Some(filter);
        self
    }

    /// Statically enable or disable the handoff.
    #[must_use]
    pub fn with_enabled(self, enabled: bool) -> Self {
        self.with_is_enabled(move |_ctx, _agent| enabled)
    }

    /// Decide per turn whether the model sees the handoff.
    #[must_use]
    pub fn with_is_enabled<F>(mut self, f: F) -> Self
    where
        F: Fn(&RunContext, &Agent) -> bool + Send + Sync + 'static,
    {
        self.is_enabled = Some(Arc::new(f));
        self
    }

    /// Tool name the model calls.
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Tool description.
    pub fn tool_description(&self) -> &str {
        &self.tool_description
    }

    /// Name of the target agent.
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Argument schema.
    pub fn input_json_schema(&self) -> &Value {
        &self.input_json_schema
    }

    /// Transcript filter, if any.
    pub fn input_filter(&self) -> Option<&HandoffInputFilter> {
        self.input_filter.as_ref()
    }

    /// Whether `agent` may offer this handoff on this turn.
    pub fn is_enabled(&self, ctx: &RunContext, agent: &Agent) -> bool {
        self.is_enabled.as_ref().is_none_or(|f| f(ctx, agent))
    }

    /// Wire description sent with each model call.
    pub fn spec(&self) -> HandoffSpec {
        HandoffSpec {
            tool_name: self.tool_name.clone(),
            tool_description: self.tool_description.clone(),
            input_json_schema: self.input_json_schema.clone(),
            strict: self.strict,
        }
    }

    /// Run the transfer callback on the model's raw arguments.
    pub async fn invoke(&self, ctx: &RunContext, arguments: &str) -> Result<Arc<Agent>, RunError> {
        (self.on_invoke)(ctx.clone(), arguments.to_owned()).await
    }
}

impl fmt::Debug for Handoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handoff")
            .field("tool_name", &self.tool_name)
            .field("agent_name", &self.agent_name)
            .field("has_input_filter", &self.input_filter.is_some())
            .finish_non_exhaustive()
    }
}
