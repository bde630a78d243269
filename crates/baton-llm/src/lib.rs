//! # baton-llm
//!
//! The model gateway seen from the run loop.
//!
//! - [`Model`]: one model endpoint, blocking or streaming
//! - [`ModelRequest`] / [`ModelSettings`]: everything a single turn sends
//! - [`ModelProvider`] / [`MultiProvider`]: resolve a model name, with
//!   `prefix/model` routing
//! - [`defaults`]: process-scoped provider defaults, read only by providers
//! - [`testing`]: a scripted in-memory model
//!
//! Provider wire formats and transports live outside this crate.

#![deny(unsafe_code)]

pub mod defaults;
pub mod errors;
pub mod model;
pub mod provider;
pub mod settings;
pub mod testing;

pub use defaults::{ProviderDefaults, provider_defaults};
pub use errors::{ModelError, ModelResult};
pub use model::{
    Model, ModelEventStream, ModelRequest, ModelStreamEvent, ModelTracing, OutputSchemaSpec,
    Prompt, RawResponseEvent,
};
pub use provider::{FnModelProvider, ModelProvider, MultiProvider};
pub use settings::{ModelSettings, ToolChoice, Truncation};
