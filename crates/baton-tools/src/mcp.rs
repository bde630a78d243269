//! Tools discovered from remote tool servers.
//!
//! The transport is the server implementation's concern; this module only
//! needs discovery (`list_tools`) and invocation (`call_tool`). Tool lists are
//! fetched fresh on every turn unless the server is wrapped in
//! [`CachedToolsServer`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{Instrument, Span, debug, info_span};

use crate::errors::ToolError;
use crate::function::{FunctionTool, ToolContext};

// ─────────────────────────────────────────────────────────────────────────────
// Protocol types
// ─────────────────────────────────────────────────────────────────────────────

/// A tool as advertised by a server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolDef {
    /// Tool name.
    pub name: String,
    /// Description for the model.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON schema of the arguments.
    pub input_schema: Value,
}

/// One content block of a call result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpContent {
    /// Text.
    Text {
        /// The text.
        text: String,
    },
    /// Base64 image.
    Image {
        /// Image data.
        data: String,
        /// MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Embedded resource.
    Resource {
        /// Resource payload.
        resource: Value,
    },
}

/// Result of a remote tool call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content blocks.
    pub content: Vec<McpContent>,
    /// Whether the server reports the call as failed.
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Collapse into a tool output value.
    ///
    /// One block becomes its text (or JSON); several become a JSON array;
    /// none becomes `"[]"`.
    pub fn into_output(self) -> Result<Value, ToolError> {
        let mut values = self
            .content
            .into_iter()
            .map(|c| match c {
                McpContent::Text { text } => Ok(Value::String(text)),
                other => serde_json::to_value(other),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match values.len() {
            0 => Value::String("[]".to_owned()),
            1 => values.remove(0),
            _ => Value::Array(values),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server trait
// ─────────────────────────────────────────────────────────────────────────────

/// A remote tool server.
#[async_trait]
pub trait McpServer: Send + Sync {
    /// Server name, used in logs and collision errors.
    fn name(&self) -> &str;

    /// Open the connection.
    async fn connect(&self) -> Result<(), ToolError>;

    /// Close the connection.
    async fn cleanup(&self) -> Result<(), ToolError>;

    /// Discover the tools currently exposed.
    async fn list_tools(&self) -> Result<Vec<McpToolDef>, ToolError>;

    /// Invoke a tool.
    async fn call_tool(&self, tool_name: &str, arguments: Option<Value>) -> Result<CallToolResult, ToolError>;
}

/// Wraps a server with a tools-list cache.
pub struct CachedToolsServer {
    inner: Arc<dyn McpServer>,
    cache: Mutex<Option<Vec<McpToolDef>>>,
}

impl CachedToolsServer {
    /// Wrap `inner`.
    pub fn new(inner: Arc<dyn McpServer>) -> Self {
        Self {
            inner,
            cache: Mutex::new(None),
        }
    }

    /// Force the next `list_tools` to query the server.
    pub fn invalidate_tools_cache(&self) {
        *self.cache.lock() = None;
    }
}

#[async_trait]
impl McpServer for CachedToolsServer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn connect(&self) -> Result<(), ToolError> {
        self.inner.connect().await
    }

    async fn cleanup(&self) -> Result<(), ToolError> {
        self.inner.cleanup().await
    }

    async fn list_tools(&self) -> Result<Vec<McpToolDef>, ToolError> {
        if let Some(cached) = self.cache.lock().clone() {
            return Ok(cached);
        }
        let tools = self.inner.list_tools().await?;
        *self.cache.lock() = Some(tools.clone());
        Ok(tools)
    }

    async fn call_tool(&self, tool_name: &str, arguments: Option<Value>) -> Result<CallToolResult, ToolError> {
        self.inner.call_tool(tool_name, arguments).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// A server tool exposed as a [`FunctionTool`].
pub struct McpTool {
    server: Arc<dyn McpServer>,
    def: McpToolDef,
    description: String,
}

impl McpTool {
    /// Adapt one advertised tool.
    pub fn new(server: Arc<dyn McpServer>, def: McpToolDef) -> Self {
        let description = def.description.clone().unwrap_or_default();
        Self {
            server,
            def,
            description,
        }
    }

    /// Name of the backing server.
    pub fn server_name(&self) -> &str {
        self.server.name()
    }
}

impl fmt::Debug for McpTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpTool")
            .field("server", &self.server.name())
            .field("name", &self.def.name)
            .finish()
    }
}

#[async_trait]
impl FunctionTool for McpTool {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn params_json_schema(&self) -> Value {
        self.def.input_schema.clone()
    }

    fn strict_json_schema(&self) -> bool {
        false
    }

    async fn invoke(&self, ctx: &ToolContext, arguments: &str) -> Result<Value, ToolError> {
        let args = if arguments.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(arguments).map_err(|e| ToolError::Validation {
                message: format!("invalid JSON arguments for {}: {e}", self.def.name),
            })?)
        };

        debug!(server = self.server.name(), tool_name = %self.def.name, call_id = %ctx.tool_call_id, "calling server tool");
        let result = self.server.call_tool(&self.def.name, args).await?;
        if result.is_error {
            let message = match result.into_output()? {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return Err(ToolError::Server {
                server: self.server.name().to_owned(),
                message,
            });
        }
        result.into_output()
    }
}

/// Discover every server's tools for this turn.
///
/// Servers are queried concurrently, each under an `mcp_tools` span when
/// `tracing_enabled`. A name exposed by two servers is a configuration error;
/// nothing is invoked in that case.
pub async fn collect_mcp_tools(
    servers: &[Arc<dyn McpServer>],
    tracing_enabled: bool,
) -> Result<Vec<Arc<dyn FunctionTool>>, ToolError> {
    let listings = futures::future::try_join_all(servers.iter().map(|server| {
        let span = if tracing_enabled {
            info_span!("mcp_tools", server = server.name())
        } else {
            Span::none()
        };
        async move { server.list_tools().await.map(|defs| (Arc::clone(server), defs)) }.instrument(span)
    }))
    .await?;

    let mut owners: HashMap<String, String> = HashMap::new();
    let mut tools: Vec<Arc<dyn FunctionTool>> = Vec::new();
    for (server, defs) in listings {
        for def in defs {
            if let Some(first) = owners.get(&def.name) {
                return Err(ToolError::DuplicateName {
                    name: def.name,
                    first: format!("server {first}"),
                    second: format!("server {}", server.name()),
                });
            }
            let _ = owners.insert(def.name.clone(), server.name().to_owned());
            tools.push(Arc::new(McpTool::new(Arc::clone(&server), def)));
        }
    }
    Ok(tools)
}
