//! # baton-tools
//!
//! Everything an agent can call.
//!
//! - [`FunctionTool`] / [`FnTool`]: runtime-executed functions with a JSON schema
//! - [`FileSearchTool`] / [`WebSearchTool`]: declarative provider-executed tools
//! - [`ComputerTool`] over a [`Computer`] device: act, then screenshot
//! - [`McpServer`] / [`McpTool`]: tools discovered from remote tool servers
//! - [`ToolRegistry`]: the per-turn tool set, with collision checks

#![deny(unsafe_code)]

pub mod computer;
pub mod errors;
pub mod function;
pub mod hosted;
pub mod mcp;
pub mod registry;

pub use computer::{Computer, ComputerOutput, ComputerTool, SafetyCheckCallback};
pub use errors::ToolError;
pub use function::{FailurePolicy, FnTool, FunctionTool, ToolContext, invoke_function_tool, output_text};
pub use hosted::{FileSearchTool, WebSearchTool};
pub use mcp::{CachedToolsServer, CallToolResult, McpContent, McpServer, McpTool, McpToolDef, collect_mcp_tools};
pub use registry::{Tool, ToolRegistry};
