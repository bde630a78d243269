//! Per-turn decisions: what happens after tools run, and tool-use tracking.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use baton_core::{RunContext, RunItem};
use serde_json::Value;

use crate::agent::Agent;
use crate::errors::RunError;

/// Outcome of one function tool call.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionToolResult {
    /// Tool name.
    pub tool_name: String,
    /// Call id.
    pub call_id: String,
    /// Value returned by the tool (or the reported error text).
    pub output: Value,
    /// Whether the tool asked to end the run with its output.
    pub ends_run: bool,
    /// Transcript item carrying the output.
    pub run_item: RunItem,
}

/// Verdict of a [`ToolsToFinalOutput`] policy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolsToFinalOutputResult {
    /// Whether the run ends now.
    pub is_final_output: bool,
    /// The final output when it does.
    pub final_output: Option<Value>,
}

impl ToolsToFinalOutputResult {
    /// Keep going.
    pub fn run_again() -> Self {
        Self::default()
    }

    /// End the run with `output`.
    pub fn finish(output: Value) -> Self {
        Self {
            is_final_output: true,
            final_output: Some(output),
        }
    }
}

/// Custom decision over a turn's tool results.
#[async_trait]
pub trait ToolsToFinalOutput: Send + Sync {
    /// Decide whether the results end the run.
    async fn decide(
        &self,
        ctx: &RunContext,
        results: &[FunctionToolResult],
    ) -> Result<ToolsToFinalOutputResult, RunError>;
}

/// Whether tool output goes back to the model or ends the run.
#[derive(Clone, Default)]
pub enum ToolUseBehavior {
    /// Feed tool output back for another model call.
    #[default]
    RunLlmAgain,
    /// The first tool's output is the final output.
    StopOnFirstTool,
    /// The output of the first listed tool that ran is the final output.
    StopAtTools(Vec<String>),
    /// A custom policy.
    Custom(Arc<dyn ToolsToFinalOutput>),
}

impl fmt::Debug for ToolUseBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunLlmAgain => f.write_str("RunLlmAgain"),
            Self::StopOnFirstTool => f.write_str("StopOnFirstTool"),
            Self::StopAtTools(names) => f.debug_tuple("StopAtTools").field(names).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// What the run loop does after a turn.
#[derive(Clone, Debug)]
pub enum NextStep {
    /// The run ends with this output (output guardrails still apply).
    FinalOutput(Value),
    /// Control moves to this agent.
    Handoff(Arc<Agent>),
    /// Call the model again with the same agent.
    RunAgain,
}

/// Final output the behavior policy derives from a turn's function tool
/// results, if any.
pub async fn final_output_from_tools(
    behavior: &ToolUseBehavior,
    ctx: &RunContext,
    results: &[FunctionToolResult],
) -> Result<Option<Value>, RunError> {
    let Some(first) = results.first() else {
        return Ok(None);
    };
    Ok(match behavior {
        ToolUseBehavior::RunLlmAgain => None,
        ToolUseBehavior::StopOnFirstTool => Some(first.output.clone()),
        ToolUseBehavior::StopAtTools(names) => results
            .iter()
            .find(|r| names.contains(&r.tool_name))
            .map(|r| r.output.clone()),
        ToolUseBehavior::Custom(policy) => {
            let verdict = policy.decide(ctx, results).await?;
            verdict
                .is_final_output
                .then(|| verdict.final_output.unwrap_or(Value::Null))
        }
    })
}

/// Which agents have used tools so far in a run.
#[derive(Debug, Default)]
pub struct AgentToolUseTracker {
    used: HashMap<String, Vec<String>>,
}

impl AgentToolUseTracker {
    /// Record the tools `agent` used on one turn.
    pub fn add_tool_use(&mut self, agent: &str, tool_names: &[String]) {
        if tool_names.is_empty() {
            return;
        }
        self.used
            .entry(agent.to_owned())
            .or_default()
            .extend(tool_names.iter().cloned());
    }

    /// Whether `agent` has used any tool.
    pub fn has_used_tools(&self, agent: &str) -> bool {
        self.used.get(agent).is_some_and(|names| !names.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::InputItem;
    use serde_json::json;

    fn result(name: &str, output: Value, ends_run: bool) -> FunctionToolResult {
        FunctionToolResult {
            tool_name: name.into(),
            call_id: format!("call_{name}"),
            output: output.clone(),
            ends_run,
            run_item: RunItem::ToolCallOutput {
                agent: "a".into(),
                call_id: format!("call_{name}"),
                output,
                raw: InputItem::FunctionCallOutput {
                    call_id: format!("call_{name}"),
                    output: String::new(),
                },
            },
        }
    }

    struct StopWhenAllDone;

    #[async_trait]
    impl ToolsToFinalOutput for StopWhenAllDone {
        async fn decide(
            &self,
            _ctx: &RunContext,
            results: &[FunctionToolResult],
        ) -> Result<ToolsToFinalOutputResult, RunError> {
            Ok(if results.len() >= 2 {
                ToolsToFinalOutputResult::finish(json!(results.len()))
            } else {
                ToolsToFinalOutputResult::run_again()
            })
        }
    }

    #[tokio::test]
    async fn run_llm_again_never_finishes() {
        let ctx = RunContext::empty();
        let out = final_output_from_tools(&ToolUseBehavior::RunLlmAgain, &ctx, &[result("a", json!(1), false)])
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn stop_on_first_tool_uses_first_output() {
        let ctx = RunContext::empty();
        let results = [result("a", json!("first"), false), result("b", json!("second"), false)];
        let out = final_output_from_tools(&ToolUseBehavior::StopOnFirstTool, &ctx, &results)
            .await
            .unwrap();
        assert_eq!(out, Some(json!("first")));
    }

    #[tokio::test]
    async fn stop_at_tools_matches_by_name() {
        let ctx = RunContext::empty();
        let results = [result("a", json!("a"), false), result("b", json!("b"), false)];
        let stop_b = ToolUseBehavior::StopAtTools(vec!["b".into()]);
        assert_eq!(final_output_from_tools(&stop_b, &ctx, &results).await.unwrap(), Some(json!("b")));
        let stop_c = ToolUseBehavior::StopAtTools(vec!["c".into()]);
        assert!(final_output_from_tools(&stop_c, &ctx, &results).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn custom_policy_decides() {
        let ctx = RunContext::empty();
        let policy = ToolUseBehavior::Custom(Arc::new(StopWhenAllDone));
        let one = [result("a", json!(1), false)];
        assert!(final_output_from_tools(&policy, &ctx, &one).await.unwrap().is_none());
        let two = [result("a", json!(1), false), result("b", json!(2), false)];
        assert_eq!(final_output_from_tools(&policy, &ctx, &two).await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn no_results_is_never_final() {
        let ctx = RunContext::empty();
        let out = final_output_from_tools(&ToolUseBehavior::StopOnFirstTool, &ctx, &[])
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn tracker_is_per_agent() {
        let mut tracker = AgentToolUseTracker::default();
        tracker.add_tool_use("a", &[]);
        assert!(!tracker.has_used_tools("a"));
        tracker.add_tool_use("a", &["search".into()]);
        assert!(tracker.has_used_tools("a"));
        assert!(!tracker.has_used_tools("b"));
    }
}
