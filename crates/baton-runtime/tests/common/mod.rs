//! Shared fixtures for the run loop integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use baton_core::RunItem;
use baton_llm::testing::ScriptedModel;
use baton_runtime::Agent;
use baton_tools::{CallToolResult, FnTool, McpContent, McpServer, McpToolDef, ToolError};
use serde_json::{Value, json};

/// Upper bound on any single run in these tests.
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Await `fut`, failing the test if it does not finish within [`TIMEOUT`].
pub async fn bounded<F: Future>(fut: F) -> F::Output {
    tokio::time::timeout(TIMEOUT, fut)
        .await
        .expect("run did not terminate in time")
}

/// Tool that returns its raw arguments.
pub fn echo_tool(name: &str) -> FnTool {
    FnTool::raw(name, "Return the arguments", json!({"type": "object"}), |_ctx, args: String| async move {
        Ok(Value::String(args))
    })
}

/// Tool that sleeps for `delay_ms`, then returns `output`.
pub fn slow_tool(name: &str, delay_ms: u64, output: &'static str) -> FnTool {
    FnTool::raw(name, "Sleep, then answer", json!({"type": "object"}), move |_ctx, _args: String| async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(Value::String(output.to_owned()))
    })
}

/// Agent named `name` driven by `model`.
pub fn agent(name: &str, model: &Arc<ScriptedModel>) -> Agent {
    Agent::new(name).with_model_instance(Arc::clone(model) as Arc<dyn baton_llm::Model>)
}

/// Kinds of `items`, in order.
pub fn kinds(items: &[RunItem]) -> Vec<&'static str> {
    items.iter().map(RunItem::kind).collect()
}

/// A tool server with a fixed tool list that counts its calls.
pub struct FakeServer {
    name: String,
    tools: Vec<McpToolDef>,
    pub list_calls: AtomicUsize,
    pub tool_calls: AtomicUsize,
}

impl FakeServer {
    pub fn new(name: &str, tool_names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            tools: tool_names
                .iter()
                .map(|t| McpToolDef {
                    name: (*t).to_owned(),
                    description: Some(format!("{t} from {name}")),
                    input_schema: json!({"type": "object"}),
                })
                .collect(),
            list_calls: AtomicUsize::new(0),
            tool_calls: AtomicUsize::new(0),
        })
    }

    pub fn tool_calls(&self) -> usize {
        self.tool_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl McpServer for FakeServer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), ToolError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ToolError> {
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<McpToolDef>, ToolError> {
        let _ = self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, tool_name: &str, _arguments: Option<Value>) -> Result<CallToolResult, ToolError> {
        let _ = self.tool_calls.fetch_add(1, Ordering::SeqCst);
        Ok(CallToolResult {
            content: vec![McpContent::Text {
                text: format!("{tool_name} from {}", self.name),
            }],
            is_error: false,
        })
    }
}
