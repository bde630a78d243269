//! An agent exposed as a function tool.

use std::sync::Arc;

use async_trait::async_trait;
use baton_tools::{FunctionTool, ToolContext, ToolError};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::agent::Agent;
use crate::config::RunConfig;
use crate::errors::RunError;
use crate::runner::Runner;

#[derive(Deserialize)]
struct AgentToolInput {
    input: String,
}

/// Runs a nested agent run on `{"input": "..."}` and returns its final text.
///
/// The nested run shares the caller's context and is cancelled with the
/// calling run.
pub struct AgentTool {
    agent: Arc<Agent>,
    name: String,
    description: String,
    config: RunConfig,
}

impl AgentTool {
    /// Wrap `agent`.
    pub fn new(agent: Arc<Agent>, name: String, description: String, config: RunConfig) -> Self {
        Self {
            agent,
            name,
            description,
            config,
        }
    }
}

#[async_trait]
impl FunctionTool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn params_json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "input": { "type": "string" } },
            "required": ["input"],
            "additionalProperties": false,
        })
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<Value, ToolError> {
        let args: AgentToolInput = serde_json::from_str(arguments).map_err(|e| ToolError::Validation {
            message: format!("invalid JSON arguments: {e}"),
        })?;
        debug!(agent = self.agent.name(), caller = %ctx.agent_name, "running agent as tool");

        let config = self.config.clone().with_cancellation(ctx.cancellation.child_token());
        match Runner::run(ctx.run_context.clone(), Arc::clone(&self.agent), args.input, config).await {
            Ok(result) => Ok(Value::String(result.final_output_text())),
            Err(RunError::Cancelled) => Err(ToolError::Cancelled),
            Err(e) => Err(ToolError::execution(format!("agent {} failed: {e}", self.agent.name()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use baton_core::RunContext;
    use baton_llm::testing::{ScriptedModel, text_message};
    use tokio_util::sync::CancellationToken;

    fn tool_ctx() -> ToolContext {
        ToolContext {
            run_context: RunContext::empty(),
            agent_name: "orchestrator".into(),
            tool_call_id: "call_1".into(),
            cancellation: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn returns_nested_final_text() {
        let model = ScriptedModel::new().then_output(vec![text_message("hola")]).shared();
        let spanish = Agent::new("spanish").with_model_instance(model.clone()).shared();
        let tool = AgentTool::new(spanish, "translate".into(), "Translate to Spanish".into(), RunConfig::default());

        let output = tool.invoke(&tool_ctx(), r#"{"input": "hello"}"#).await.unwrap();
        assert_eq!(output, json!("hola"));
        assert_matches!(model.requests()[0].input.as_slice(), [item] if *item == baton_core::InputItem::user("hello"));
    }

    #[tokio::test]
    async fn bad_arguments_are_validation_errors() {
        let tool = AgentTool::new(Agent::new("x").shared(), "x".into(), "x".into(), RunConfig::default());
        assert_matches!(tool.invoke(&tool_ctx(), "{}").await, Err(ToolError::Validation { .. }));
    }

    #[tokio::test]
    async fn nested_failures_become_execution_errors() {
        let model = ScriptedModel::new().shared();
        let agent = Agent::new("empty").with_model_instance(model).shared();
        let tool = AgentTool::new(agent, "x".into(), "x".into(), RunConfig::default());
        let err = tool.invoke(&tool_ctx(), r#"{"input": "hi"}"#).await.unwrap_err();
        assert!(err.to_string().contains("agent empty failed"));
    }
}
