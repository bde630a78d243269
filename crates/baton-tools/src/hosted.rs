//! Declarative tools the provider executes itself.

use baton_core::ToolSpec;
use serde_json::Value;

/// Search over provider-hosted vector stores.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileSearchTool {
    /// Vector stores to search.
    pub vector_store_ids: Vec<String>,
    /// Result cap.
    pub max_num_results: Option<u32>,
    /// Whether to return result payloads to the model.
    pub include_search_results: bool,
}

impl FileSearchTool {
    /// Search the given stores.
    pub fn new(vector_store_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            vector_store_ids: vector_store_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Provider-neutral description.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec::FileSearch {
            vector_store_ids: self.vector_store_ids.clone(),
            max_num_results: self.max_num_results,
            include_search_results: self.include_search_results,
        }
    }
}

/// Provider-hosted web search.
#[derive(Clone, Debug, PartialEq)]
pub struct WebSearchTool {
    /// Approximate user location.
    pub user_location: Option<Value>,
    /// `low`, `medium` or `high`.
    pub search_context_size: String,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self {
            user_location: None,
            search_context_size: "medium".to_owned(),
        }
    }
}

impl WebSearchTool {
    /// Provider-neutral description.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec::WebSearch {
            user_location: self.user_location.clone(),
            search_context_size: self.search_context_size.clone(),
        }
    }
}
