//! What a finished run hands back.

use std::collections::BTreeMap;
use std::sync::Arc;

use baton_core::{InputItem, ItemHelpers, ModelResponse, RunInput, RunItem, Usage};
use baton_guardrails::GuardrailResult;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::agent::Agent;
use crate::errors::RunError;

/// Outcome of a completed run.
#[derive(Clone, Debug)]
pub struct RunResult {
    /// Input the run started from.
    pub input: RunInput,
    /// Every item produced during the run, unfiltered.
    pub new_items: Vec<RunItem>,
    /// Every model response, in turn order.
    pub raw_responses: Vec<ModelResponse>,
    /// The final output value.
    pub final_output: Value,
    /// Agent that produced the final output.
    pub last_agent: Arc<Agent>,
    /// Results of the input guardrails.
    pub input_guardrail_results: Vec<GuardrailResult>,
    /// Results of the output guardrails.
    pub output_guardrail_results: Vec<GuardrailResult>,
    /// Usage summed over every model call.
    pub usage: Usage,
    /// Usage per agent name.
    pub usage_by_agent: BTreeMap<String, Usage>,
    /// Number of turns taken.
    pub turns: u32,
}

impl RunResult {
    /// Original input followed by every new item, ready to feed a follow-up run.
    pub fn to_input_list(&self) -> Vec<InputItem> {
        let mut items = self.input.to_items();
        items.extend(self.new_items.iter().map(RunItem::to_input_item));
        items
    }

    /// Final output deserialized into `T`.
    pub fn final_output_as<T: DeserializeOwned>(&self) -> Result<T, RunError> {
        serde_json::from_value(self.final_output.clone()).map_err(|e| {
            RunError::user(format!(
                "final output of agent {} is not the requested type: {e}",
                self.last_agent.name()
            ))
        })
    }

    /// Final output as text. Strings come back verbatim, anything else as JSON.
    pub fn final_output_text(&self) -> String {
        match &self.final_output {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Text of every message the run produced.
    pub fn message_text(&self) -> String {
        ItemHelpers::text_message_outputs(&self.new_items)
    }

    /// Provider id of the last response.
    pub fn last_response_id(&self) -> Option<&str> {
        self.raw_responses.last().and_then(|r| r.response_id.as_deref())
    }

    /// Name of the agent that finished the run.
    pub fn last_agent_name(&self) -> &str {
        self.last_agent.name()
    }
}
