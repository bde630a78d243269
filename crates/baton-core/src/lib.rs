//! # baton-core
//!
//! Foundation types shared by every Baton crate.
//!
//! - **Items**: [`OutputItem`] (what a model emits), [`InputItem`] (what a model
//!   receives), and [`RunItem`] (the agent-tagged transcript a run produces)
//! - **Responses**: [`ModelResponse`] with its [`Usage`] snapshot
//! - **Context**: [`RunContext`], the caller value threaded through hooks and tools
//! - **Tool specs**: provider-neutral descriptions of tools and handoffs
//! - **Computer vocabulary**: actions, buttons, environments, safety checks
//! - **Logging**: subscriber bootstrap and in-memory capture for tests

#![deny(unsafe_code)]

pub mod computer;
pub mod context;
pub mod ids;
pub mod items;
pub mod logging;
pub mod response;
pub mod tool_spec;
pub mod usage;

pub use computer::{ComputerAction, Environment, MouseButton, Point, SafetyCheck};
pub use context::RunContext;
pub use items::{
    FunctionCall, HostedToolCall, InputItem, ItemHelpers, MessageContent, OutputItem,
    OutputMessage, ReasoningItem, Role, RunInput, RunItem, ToolCallRaw,
};
pub use computer::ComputerCall;
pub use response::ModelResponse;
pub use tool_spec::{HandoffSpec, ToolSpec};
pub use usage::Usage;
