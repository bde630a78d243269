//! A scripted in-memory [`Model`] for tests and demos.
//!
//! Each call consumes the next scripted turn. Every request is recorded so
//! tests can assert on what the run loop sent.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use baton_core::{
    ComputerAction, ComputerCall, FunctionCall, ModelResponse, OutputItem, OutputMessage,
    ReasoningItem, Usage, ids,
};
use parking_lot::Mutex;

use crate::errors::{ModelError, ModelResult};
use crate::model::{Model, ModelEventStream, ModelRequest, ModelStreamEvent, RawResponseEvent};

/// Usage attached to every scripted response.
pub const SCRIPTED_USAGE: Usage = Usage {
    requests: 1,
    input_tokens: 10,
    output_tokens: 5,
    total_tokens: 15,
};

/// What one scripted call does.
#[derive(Debug)]
pub enum ScriptedTurn {
    /// Return these items.
    Respond(ModelResponse),
    /// Fail with this error.
    Fail(ModelError),
    /// Panic with this message.
    Panic(String),
    /// Never complete.
    Hang,
}

/// Model that replays a fixed script.
pub struct ScriptedModel {
    name: String,
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    /// An empty script.
    pub fn new() -> Self {
        Self::named("scripted")
    }

    /// An empty script with a model name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            turns: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append a turn returning `output`.
    #[must_use]
    pub fn then_output(self, output: Vec<OutputItem>) -> Self {
        self.push_output(output);
        self
    }

    /// Append a turn returning a full response.
    #[must_use]
    pub fn then_response(self, response: ModelResponse) -> Self {
        self.turns.lock().push_back(ScriptedTurn::Respond(response));
        self
    }

    /// Append a failing turn.
    #[must_use]
    pub fn then_fail(self, error: ModelError) -> Self {
        self.turns.lock().push_back(ScriptedTurn::Fail(error));
        self
    }

    /// Append a panicking turn.
    #[must_use]
    pub fn then_panic(self, message: impl Into<String>) -> Self {
        self.turns.lock().push_back(ScriptedTurn::Panic(message.into()));
        self
    }

    /// Append a turn that never completes.
    #[must_use]
    pub fn then_hang(self) -> Self {
        self.turns.lock().push_back(ScriptedTurn::Hang);
        self
    }

    /// Append a turn returning `output` on an already shared model.
    pub fn push_output(&self, output: Vec<OutputItem>) {
        self.turns
            .lock()
            .push_back(ScriptedTurn::Respond(ModelResponse::new(output, SCRIPTED_USAGE)));
    }

    /// Wrap in an `Arc` for sharing with agents.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Scripted turns not yet consumed.
    pub fn remaining(&self) -> usize {
        self.turns.lock().len()
    }

    fn next_turn(&self, request: &ModelRequest) -> ScriptedTurn {
        self.requests.lock().push(request.clone());
        self.turns.lock().pop_front().unwrap_or_else(|| {
            ScriptedTurn::Fail(ModelError::other(format!(
                "scripted model {} has no turns left",
                self.name
            )))
        })
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

async fn play(turn: ScriptedTurn) -> ModelResult<ModelResponse> {
    match turn {
        ScriptedTurn::Respond(response) => Ok(response),
        ScriptedTurn::Fail(error) => Err(error),
        ScriptedTurn::Panic(message) => panic!("{message}"),
        ScriptedTurn::Hang => futures::future::pending().await,
    }
}

#[async_trait]
impl Model for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_response(&self, request: &ModelRequest) -> ModelResult<ModelResponse> {
        let turn = self.next_turn(request);
        play(turn).await
    }

    async fn stream_response(&self, request: &ModelRequest) -> ModelResult<ModelEventStream> {
        let turn = self.next_turn(request);
        let stream = async_stream::stream! {
            let response = match play(turn).await {
                Ok(response) => response,
                Err(error) => {
                    yield Err(error);
                    return;
                }
            };
            yield Ok(ModelStreamEvent::Raw(RawResponseEvent::Created {
                response_id: response.response_id.clone(),
            }));
            for item in &response.output {
                if let OutputItem::Message(message) = item {
                    for text in baton_core::ItemHelpers::text_message_output(message).split_inclusive(' ') {
                        yield Ok(ModelStreamEvent::Raw(RawResponseEvent::OutputTextDelta {
                            item_id: message.id.clone(),
                            delta: text.to_owned(),
                        }));
                    }
                }
                yield Ok(ModelStreamEvent::Raw(RawResponseEvent::OutputItemDone { item: item.clone() }));
            }
            yield Ok(ModelStreamEvent::Completed(response));
        };
        Ok(Box::pin(stream))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Item builders
// ─────────────────────────────────────────────────────────────────────────────

/// An assistant text message.
pub fn text_message(text: impl Into<String>) -> OutputItem {
    OutputItem::Message(OutputMessage::text(ids::message_id(), text))
}

/// A function call with a fresh call id.
pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> OutputItem {
    OutputItem::FunctionCall(FunctionCall {
        id: ids::generate_id("fc"),
        call_id: ids::call_id(),
        name: name.into(),
        arguments: arguments.into(),
    })
}

/// A function call with a fixed call id.
pub fn function_call_with_id(
    call_id: impl Into<String>,
    name: impl Into<String>,
    arguments: impl Into<String>,
) -> OutputItem {
    OutputItem::FunctionCall(FunctionCall {
        id: ids::generate_id("fc"),
        call_id: call_id.into(),
        name: name.into(),
        arguments: arguments.into(),
    })
}

/// A computer call without safety checks.
pub fn computer_call(action: ComputerAction) -> OutputItem {
    OutputItem::ComputerCall(ComputerCall {
        id: ids::generate_id("cu"),
        call_id: ids::call_id(),
        action,
        pending_safety_checks: Vec::new(),
    })
}

/// A reasoning summary.
pub fn reasoning(summary: impl Into<String>) -> OutputItem {
    OutputItem::Reasoning(ReasoningItem {
        id: ids::generate_id("rs"),
        summary: vec![summary.into()],
    })
}
