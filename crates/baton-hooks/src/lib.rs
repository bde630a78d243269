//! # baton-hooks
//!
//! Lifecycle hooks observe a run: agent start/end, LLM start/end, tool
//! start/end and handoffs. Hooks come in two scopes, one attached to the run
//! and one attached to an agent; for every event the run-scoped hooks fire
//! first. A hook error aborts the run.

#![deny(unsafe_code)]

pub mod engine;
pub mod errors;
pub mod handler;
pub mod recording;
pub mod types;

pub use engine::HookEngine;
pub use errors::HookError;
pub use handler::LifecycleHooks;
pub use recording::RecordingHooks;
pub use types::HookEvent;
