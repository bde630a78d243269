//! Provider-neutral tool and handoff descriptions sent with each model call.
//!
//! Converting these into a specific provider's request schema is the
//! provider adapter's job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::computer::Environment;

/// A tool as presented to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolSpec {
    /// A function the runtime executes.
    Function {
        /// Tool name.
        name: String,
        /// Description for the model.
        description: String,
        /// JSON schema of the arguments.
        parameters: Value,
        /// Whether the provider should enforce the schema strictly.
        strict: bool,
    },
    /// Provider-executed file search.
    FileSearch {
        /// Vector stores to search.
        vector_store_ids: Vec<String>,
        /// Result cap.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_num_results: Option<u32>,
        /// Whether to include result payloads.
        include_search_results: bool,
    },
    /// Provider-executed web search.
    WebSearch {
        /// Approximate user location hint.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_location: Option<Value>,
        /// `low`, `medium` or `high`.
        search_context_size: String,
    },
    /// Computer control surface.
    Computer {
        /// Device environment.
        environment: Environment,
        /// Viewport width in pixels.
        display_width: u32,
        /// Viewport height in pixels.
        display_height: u32,
    },
}

impl ToolSpec {
    /// Name used for logging and collision checks.
    pub fn name(&self) -> &str {
        match self {
            Self::Function { name, .. } => name,
            Self::FileSearch { .. } => "file_search",
            Self::WebSearch { .. } => "web_search_preview",
            Self::Computer { .. } => "computer_use_preview",
        }
    }
}

/// A handoff as presented to the model: a function-shaped tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandoffSpec {
    /// Generated tool name, e.g. `transfer_to_billing_agent`.
    pub tool_name: String,
    /// Description for the model.
    pub tool_description: String,
    /// JSON schema of the arguments.
    pub input_json_schema: Value,
    /// Whether the provider should enforce the schema strictly.
    pub strict: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosted_tool_names() {
        let web = ToolSpec::WebSearch {
            user_location: None,
            search_context_size: "medium".into(),
        };
        assert_eq!(web.name(), "web_search_preview");
        let computer = ToolSpec::Computer {
            environment: Environment::Browser,
            display_width: 1024,
            display_height: 768,
        };
        assert_eq!(computer.name(), "computer_use_preview");
    }

    #[test]
    fn function_spec_json_shape() {
        let spec = ToolSpec::Function {
            name: "get_weather".into(),
            description: "Weather lookup".into(),
            parameters: serde_json::json!({"type": "object"}),
            strict: true,
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "function");
        assert_eq!(json["name"], "get_weather");
    }
}
