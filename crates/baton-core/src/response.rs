//! One model call's aggregate result.

use serde::{Deserialize, Serialize};

use crate::items::{InputItem, OutputItem};
use crate::usage::Usage;

/// Output items, usage and continuity token of a single model call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Items in the order the model produced them.
    pub output: Vec<OutputItem>,
    /// Usage of this call.
    pub usage: Usage,
    /// Provider-assigned id for server-side conversation state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
}

impl ModelResponse {
    /// Create a response from output items.
    pub fn new(output: Vec<OutputItem>, usage: Usage) -> Self {
        Self {
            output,
            usage,
            response_id: None,
        }
    }

    /// Attach a provider response id.
    #[must_use]
    pub fn with_response_id(mut self, id: impl Into<String>) -> Self {
        self.response_id = Some(id.into());
        self
    }

    /// Output items in transcript form. Unknown items are dropped.
    pub fn to_input_items(&self) -> Vec<InputItem> {
        self.output
            .iter()
            .filter_map(OutputItem::to_input_item)
            .collect()
    }
}
