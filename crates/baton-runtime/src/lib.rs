//! # baton-runtime
//!
//! The agent run loop.
//!
//! - [`Agent`]: instructions, model, tools, handoffs, guardrails, output type
//! - [`Runner`]: [`Runner::run`] to completion or [`Runner::run_streamed`] as
//!   a stream of [`StreamEvent`]s
//! - [`RunConfig`]: per-run overrides (model, turn budget, tracing, policies)
//! - [`Handoff`]: delegation to another agent, with optional input filtering
//! - [`RunResult`]: final output, transcript, raw responses and usage
//! - [`RunError`]: why a run stopped without a final output
//!
//! Each turn calls the model once, runs the requested tools concurrently and
//! then hands off, finishes, or calls the model again.

#![deny(unsafe_code)]

pub mod agent;
pub mod agent_tool;
pub mod config;
pub mod errors;
pub mod handoff;
pub mod handoff_filters;
pub mod handoff_resolver;
pub mod output;
pub mod response_processor;
pub mod result;
pub mod runner;
pub mod streaming;
pub mod tool_executor;
pub mod trace;
pub mod turn;

pub use agent::{Agent, AgentModel, Instructions};
pub use agent_tool::AgentTool;
pub use config::{DEFAULT_MAX_TURNS, DEFAULT_WORKFLOW_NAME, RunConfig};
pub use errors::{GuardrailStage, RunError};
pub use handoff::{Handoff, HandoffInputData, HandoffInputFilter, handoff};
pub use output::{OutputSchema, OutputType};
pub use result::RunResult;
pub use runner::Runner;
pub use streaming::{RunResultStreaming, StreamEvent};
pub use trace::{TraceInfo, current_trace, with_trace};
pub use turn::{ToolUseBehavior, ToolsToFinalOutput, ToolsToFinalOutputResult};
