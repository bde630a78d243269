//! Classification of one model response into transcript items and pending work.

use std::fmt;
use std::sync::Arc;

use baton_core::{ComputerCall, FunctionCall, ModelResponse, OutputItem, RunItem, ToolCallRaw};
use baton_tools::{ComputerTool, FunctionTool, ToolRegistry};
use tracing::{debug, warn};

use crate::errors::RunError;
use crate::handoff::Handoff;

/// A function tool call to execute.
#[derive(Clone)]
pub struct ToolRunFunction {
    /// The model's call.
    pub call: FunctionCall,
    /// Resolved tool.
    pub tool: Arc<dyn FunctionTool>,
}

impl fmt::Debug for ToolRunFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRunFunction")
            .field("call", &self.call)
            .field("tool", &self.tool.name())
            .finish()
    }
}

/// A computer action to execute.
#[derive(Clone, Debug)]
pub struct ToolRunComputer {
    /// The model's call.
    pub call: ComputerCall,
    /// The agent's computer tool.
    pub tool: ComputerTool,
}

/// A handoff the model requested.
#[derive(Clone, Debug)]
pub struct ToolRunHandoff {
    /// The model's call.
    pub call: FunctionCall,
    /// Matched descriptor.
    pub handoff: Handoff,
}

/// One turn's classified output.
#[derive(Clone, Debug, Default)]
pub struct ProcessedResponse {
    /// Transcript items in model order.
    pub new_items: Vec<RunItem>,
    /// Requested handoffs in model order. Only the first is acted upon.
    pub handoffs: Vec<ToolRunHandoff>,
    /// Function tool calls to execute.
    pub functions: Vec<ToolRunFunction>,
    /// Computer actions to execute, in model order.
    pub computer_actions: Vec<ToolRunComputer>,
    /// Names of every tool (and handoff tool) the model called.
    pub tools_used: Vec<String>,
    /// A called function tool ends the run with its output.
    pub tools_end_run: bool,
}

impl ProcessedResponse {
    /// Whether any runtime-executed tool is pending.
    pub fn has_tools_to_run(&self) -> bool {
        !self.functions.is_empty() || !self.computer_actions.is_empty()
    }

    /// Whether the model requested a handoff.
    pub fn has_handoff(&self) -> bool {
        !self.handoffs.is_empty()
    }

    /// Call ids of the runtime-executed tool calls, in model order.
    pub fn tool_call_order(&self) -> Vec<String> {
        self.new_items
            .iter()
            .filter(|item| matches!(item, RunItem::ToolCall { .. }))
            .filter_map(RunItem::call_id)
            .map(str::to_owned)
            .collect()
    }
}

/// Classify `response` against the active agent's tools and enabled handoffs.
///
/// Every output item becomes exactly one transcript item, in order. A call to
/// an unknown tool, a computer call without a computer tool, and an
/// unrecognised item are model behavior errors.
pub fn process_model_response(
    agent_name: &str,
    registry: &ToolRegistry,
    response: &ModelResponse,
    handoffs: &[Handoff],
) -> Result<ProcessedResponse, RunError> {
    let mut processed = ProcessedResponse::default();

    for item in &response.output {
        match item {
            OutputItem::Message(message) => processed.new_items.push(RunItem::MessageOutput {
                agent: agent_name.to_owned(),
                raw: message.clone(),
            }),
            OutputItem::Reasoning(reasoning) => processed.new_items.push(RunItem::Reasoning {
                agent: agent_name.to_owned(),
                raw: reasoning.clone(),
            }),
            OutputItem::FileSearchCall(call) => {
                processed.new_items.push(RunItem::ToolCall {
                    agent: agent_name.to_owned(),
                    raw: ToolCallRaw::FileSearchCall(call.clone()),
                });
                processed.tools_used.push("file_search".to_owned());
            }
            OutputItem::WebSearchCall(call) => {
                processed.new_items.push(RunItem::ToolCall {
                    agent: agent_name.to_owned(),
                    raw: ToolCallRaw::WebSearchCall(call.clone()),
                });
                processed.tools_used.push("web_search".to_owned());
            }
            OutputItem::ComputerCall(call) => {
                let Some(tool) = registry.computer() else {
                    warn!(agent = agent_name, call_id = %call.call_id, "computer action without a computer tool");
                    return Err(RunError::model_behavior(format!(
                        "Model produced computer action without a computer tool in agent {agent_name}"
                    )));
                };
                processed.new_items.push(RunItem::ToolCall {
                    agent: agent_name.to_owned(),
                    raw: ToolCallRaw::ComputerCall(call.clone()),
                });
                processed.tools_used.push(tool.name().to_owned());
                processed.computer_actions.push(ToolRunComputer {
                    call: call.clone(),
                    tool: tool.clone(),
                });
            }
            OutputItem::FunctionCall(call) => {
                if let Some(handoff) = handoffs.iter().find(|h| h.tool_name() == call.name) {
                    debug!(agent = agent_name, handoff = %call.name, "handoff requested");
                    processed.new_items.push(RunItem::HandoffCall {
                        agent: agent_name.to_owned(),
                        raw: call.clone(),
                    });
                    processed.tools_used.push(call.name.clone());
                    processed.handoffs.push(ToolRunHandoff {
                        call: call.clone(),
                        handoff: handoff.clone(),
                    });
                    continue;
                }
                let Some(tool) = registry.function(&call.name) else {
                    warn!(agent = agent_name, tool_name = %call.name, "model called an unknown tool");
                    return Err(RunError::model_behavior(format!(
                        "Tool {} not found in agent {agent_name}",
                        call.name
                    )));
                };
                processed.new_items.push(RunItem::ToolCall {
                    agent: agent_name.to_owned(),
                    raw: ToolCallRaw::FunctionCall(call.clone()),
                });
                processed.tools_used.push(call.name.clone());
                processed.tools_end_run |= tool.ends_run();
                processed.functions.push(ToolRunFunction {
                    call: call.clone(),
                    tool,
                });
            }
            OutputItem::Unknown { item_type, .. } => {
                return Err(RunError::model_behavior(format!("Unexpected output type: {item_type}")));
            }
        }
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::handoff::handoff;
    use assert_matches::assert_matches;
    use baton_core::{ComputerAction, HostedToolCall, Usage};
    use baton_llm::testing::{computer_call, function_call, reasoning, text_message};
    use baton_tools::{FnTool, Tool};
    use serde_json::{Value, json};

    fn registry(names: &[&str]) -> ToolRegistry {
        let tools: Vec<Tool> = names
            .iter()
            .map(|name| Tool::function(FnTool::raw(*name, "stub", json!({}), |_ctx, _args| async { Ok(Value::Null) })))
            .collect();
        ToolRegistry::assemble(&tools, Vec::new()).unwrap()
    }

    fn response(output: Vec<OutputItem>) -> ModelResponse {
        ModelResponse::new(output, Usage::single(1, 1))
    }

    #[test]
    fn preserves_model_order() {
        let billing = handoff(Agent::new("billing").shared());
        let processed = process_model_response(
            "triage",
            &registry(&["lookup"]),
            &response(vec![
                reasoning("thinking"),
                text_message("let me check"),
                function_call("lookup", "{}"),
                function_call("transfer_to_billing", "{}"),
            ]),
            &[billing],
        )
        .unwrap();

        let kinds: Vec<&str> = processed.new_items.iter().map(RunItem::kind).collect();
        assert_eq!(
            kinds,
            vec!["reasoning_item", "message_output_item", "tool_call_item", "handoff_call_item"]
        );
        assert_eq!(processed.functions.len(), 1);
        assert_eq!(processed.handoffs.len(), 1);
        assert_eq!(processed.tools_used, vec!["lookup", "transfer_to_billing"]);
        assert!(processed.has_tools_to_run());
        assert!(processed.has_handoff());
        assert!(!processed.tools_end_run);
        assert_eq!(processed.tool_call_order().len(), 1);
        assert!(processed.new_items.iter().all(|i| i.agent_name() == "triage"));
    }

    #[test]
    fn ending_tools_are_flagged() {
        let tools = vec![
            Tool::function(FnTool::raw("lookup", "stub", json!({}), |_ctx, _args| async { Ok(Value::Null) })),
            Tool::function(
                FnTool::raw("submit", "stub", json!({}), |_ctx, _args| async { Ok(Value::Null) }).ending_run(),
            ),
        ];
        let registry = ToolRegistry::assemble(&tools, Vec::new()).unwrap();

        let lookup_only = process_model_response("a", &registry, &response(vec![function_call("lookup", "{}")]), &[])
            .unwrap();
        assert!(!lookup_only.tools_end_run);

        let both = process_model_response(
            "a",
            &registry,
            &response(vec![function_call("lookup", "{}"), function_call("submit", "{}")]),
            &[],
        )
        .unwrap();
        assert!(both.tools_end_run);
    }

    #[test]
    fn unknown_tool_is_model_behavior() {
        let err = process_model_response(
            "a",
            &registry(&["test"]),
            &response(vec![function_call("missing", "{}")]),
            &[],
        )
        .unwrap_err();
        assert_matches!(err, RunError::ModelBehavior { ref message } if message.contains("missing"));
    }

    #[test]
    fn undeclared_handoff_is_model_behavior() {
        let err = process_model_response(
            "a",
            &registry(&[]),
            &response(vec![function_call("transfer_to_nobody", "{}")]),
            &[],
        )
        .unwrap_err();
        assert_matches!(err, RunError::ModelBehavior { .. });
    }

    #[test]
    fn computer_call_requires_computer_tool() {
        let err = process_model_response(
            "a",
            &registry(&[]),
            &response(vec![computer_call(ComputerAction::Screenshot)]),
            &[],
        )
        .unwrap_err();
        assert_matches!(err, RunError::ModelBehavior { ref message } if message.contains("computer"));
    }

    #[test]
    fn hosted_calls_are_recorded_not_run() {
        let call = HostedToolCall {
            id: "ws_1".into(),
            status: Some("completed".into()),
            payload: Value::Null,
        };
        let processed = process_model_response(
            "a",
            &registry(&[]),
            &response(vec![OutputItem::WebSearchCall(call.clone()), OutputItem::FileSearchCall(call)]),
            &[],
        )
        .unwrap();
        assert_eq!(processed.new_items.len(), 2);
        assert!(!processed.has_tools_to_run());
        assert_eq!(processed.tools_used, vec!["web_search", "file_search"]);
    }

    #[test]
    fn unknown_item_type_is_model_behavior() {
        let err = process_model_response(
            "a",
            &registry(&[]),
            &response(vec![OutputItem::Unknown {
                item_type: "image_generation_call".into(),
                payload: Value::Null,
            }]),
            &[],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Model behavior error: Unexpected output type: image_generation_call"
        );
    }
}
