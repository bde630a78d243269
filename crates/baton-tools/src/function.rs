//! Function tools: runtime-executed callbacks with a JSON-schema interface.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use baton_core::{RunContext, ToolSpec};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::ToolError;

// ─────────────────────────────────────────────────────────────────────────────
// Tool context
// ─────────────────────────────────────────────────────────────────────────────

/// Context passed to every tool invocation.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Caller context of the run.
    pub run_context: RunContext,
    /// Name of the agent whose turn issued the call.
    pub agent_name: String,
    /// Call identifier from the model.
    pub tool_call_id: String,
    /// Run cancellation signal.
    pub cancellation: CancellationToken,
}

// ─────────────────────────────────────────────────────────────────────────────
// FunctionTool trait
// ─────────────────────────────────────────────────────────────────────────────

/// What happens when a function tool returns an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The error text becomes the call's output and the run continues.
    #[default]
    ReportToModel,
    /// The error aborts the run.
    Fail,
}

/// A tool the runtime executes on the model's behalf.
#[async_trait]
pub trait FunctionTool: Send + Sync {
    /// Name the model calls the tool by.
    fn name(&self) -> &str;

    /// Description for the model.
    fn description(&self) -> &str;

    /// JSON schema of the arguments.
    fn params_json_schema(&self) -> Value;

    /// Whether the provider should enforce the schema strictly.
    fn strict_json_schema(&self) -> bool {
        true
    }

    /// Optional time limit in milliseconds.
    fn timeout_ms(&self) -> Option<u64> {
        None
    }

    /// Error handling policy.
    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::ReportToModel
    }

    /// Whether this tool's output should end the run as the final output.
    fn ends_run(&self) -> bool {
        false
    }

    /// Invoke with the model's raw argument string.
    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<Value, ToolError>;

    /// Provider-neutral description.
    fn spec(&self) -> ToolSpec {
        ToolSpec::Function {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            parameters: self.params_json_schema(),
            strict: self.strict_json_schema(),
        }
    }
}

/// Invoke a function tool under its time limit and the run's cancellation.
pub async fn invoke_function_tool(
    tool: &dyn FunctionTool,
    ctx: &ToolContext,
    arguments: &str,
) -> Result<Value, ToolError> {
    let call = async {
        match tool.timeout_ms() {
            Some(timeout_ms) => {
                tokio::time::timeout(Duration::from_millis(timeout_ms), tool.invoke(ctx, arguments))
                    .await
                    .map_err(|_| ToolError::Timeout { timeout_ms })?
            }
            None => tool.invoke(ctx, arguments).await,
        }
    };

    tokio::select! {
        biased;
        () = ctx.cancellation.cancelled() => {
            debug!(tool_name = tool.name(), call_id = %ctx.tool_call_id, "tool cancelled");
            Err(ToolError::Cancelled)
        }
        result = call => result,
    }
}

/// Transcript text for a tool's return value.
///
/// Strings are used verbatim; other values are serialized as JSON.
pub fn output_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FnTool
// ─────────────────────────────────────────────────────────────────────────────

type Handler = Arc<dyn Fn(ToolContext, String) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

/// A function tool backed by a closure.
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    schema: Value,
    strict: bool,
    timeout_ms: Option<u64>,
    failure_policy: FailurePolicy,
    ends_run: bool,
    handler: Handler,
}

impl FnTool {
    /// A tool whose closure receives the raw argument string.
    pub fn raw<F, Fut>(name: impl Into<String>, description: impl Into<String>, schema: Value, f: F) -> Self
    where
        F: Fn(ToolContext, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
            strict: true,
            timeout_ms: None,
            failure_policy: FailurePolicy::default(),
            ends_run: false,
            handler: Arc::new(move |ctx, args| Box::pin(f(ctx, args))),
        }
    }

    /// A tool whose closure receives arguments decoded into `A`.
    ///
    /// Arguments that do not decode fail with [`ToolError::Validation`].
    pub fn json<A, F, Fut>(name: impl Into<String>, description: impl Into<String>, schema: Value, f: F) -> Self
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(ToolContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        let f = Arc::new(f);
        Self::raw(name, description, schema, move |ctx, args: String| {
            let f = Arc::clone(&f);
            async move {
                let raw = if args.trim().is_empty() { "{}" } else { args.as_str() };
                let parsed: A = serde_json::from_str(raw).map_err(|e| ToolError::Validation {
                    message: format!("invalid JSON arguments: {e}"),
                })?;
                f(ctx, parsed).await
            }
        })
    }

    /// Disable strict schema enforcement.
    #[must_use]
    pub fn non_strict(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Set a time limit.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the error policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Make this tool's output the run's final output.
    #[must_use]
    pub fn ending_run(mut self) -> Self {
        self.ends_run = true;
        self
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("timeout_ms", &self.timeout_ms)
            .field("failure_policy", &self.failure_policy)
            .field("ends_run", &self.ends_run)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FunctionTool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn params_json_schema(&self) -> Value {
        self.schema.clone()
    }

    fn strict_json_schema(&self) -> bool {
        self.strict
    }

    fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    fn ends_run(&self) -> bool {
        self.ends_run
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<Value, ToolError> {
        (self.handler)(ctx.clone(), arguments.to_owned()).await
    }
}
