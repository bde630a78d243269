//! The [`Model`] contract and the per-turn request it receives.

use std::pin::Pin;

use async_trait::async_trait;
use baton_core::{HandoffSpec, InputItem, ModelResponse, OutputItem, ToolSpec};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ModelResult;
use crate::settings::ModelSettings;

/// A stored prompt template reference resolved by the provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Prompt identifier.
    pub id: String,
    /// Pinned version, or latest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Template variables.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
}

/// Structured output constraint sent to the provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutputSchemaSpec {
    /// Schema name.
    pub name: String,
    /// JSON schema of the final output.
    pub schema: Value,
    /// Whether the provider should enforce the schema strictly.
    pub strict: bool,
}

/// How much the provider adapter may record in its own traces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTracing {
    /// No instrumentation.
    Disabled,
    /// Instrumentation including inputs and outputs.
    #[default]
    Enabled,
    /// Instrumentation without inputs and outputs.
    EnabledWithoutData,
}

/// Everything one turn sends to the model.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ModelRequest {
    /// Resolved system instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instructions: Option<String>,
    /// Stored prompt reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Prompt>,
    /// Full model-facing transcript.
    pub input: Vec<InputItem>,
    /// Resolved tuning.
    pub settings: ModelSettings,
    /// Tools the model may call.
    pub tools: Vec<ToolSpec>,
    /// Structured output constraint, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<OutputSchemaSpec>,
    /// Handoffs the model may request.
    pub handoffs: Vec<HandoffSpec>,
    /// Continuity token from the previous turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    /// Instrumentation level.
    pub tracing: ModelTracing,
}

/// A provider-level incremental event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawResponseEvent {
    /// The provider accepted the request.
    Created {
        /// Provider response id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_id: Option<String>,
    },
    /// A chunk of message text.
    OutputTextDelta {
        /// Item being produced.
        item_id: String,
        /// Text chunk.
        delta: String,
    },
    /// A chunk of function call arguments.
    FunctionCallArgumentsDelta {
        /// Item being produced.
        item_id: String,
        /// Argument chunk.
        delta: String,
    },
    /// An output item is complete.
    OutputItemDone {
        /// The finished item.
        item: OutputItem,
    },
    /// A provider event without a dedicated variant.
    Other {
        /// Event payload.
        payload: Value,
    },
}

/// One element of a streamed model call.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelStreamEvent {
    /// Incremental provider event.
    Raw(RawResponseEvent),
    /// The aggregate response. Always the last element.
    Completed(ModelResponse),
}

/// Boxed stream returned by [`Model::stream_response`].
pub type ModelEventStream = Pin<Box<dyn Stream<Item = ModelResult<ModelStreamEvent>> + Send>>;

/// One model endpoint.
///
/// `stream_response` must end with exactly one [`ModelStreamEvent::Completed`]
/// holding the same aggregate shape `get_response` returns.
#[async_trait]
pub trait Model: Send + Sync {
    /// Model identifier, for logs.
    fn name(&self) -> &str;

    /// Run the request to completion.
    async fn get_response(&self, request: &ModelRequest) -> ModelResult<ModelResponse>;

    /// Run the request, yielding raw events before the aggregate response.
    ///
    /// The default yields only the aggregate from [`Model::get_response`].
    async fn stream_response(&self, request: &ModelRequest) -> ModelResult<ModelEventStream> {
        let response = self.get_response(request).await?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok(ModelStreamEvent::Completed(response))
        })))
    }
}
