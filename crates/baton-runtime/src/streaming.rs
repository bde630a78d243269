//! Streaming mode: the run loop on a background task, events on a queue.
//!
//! The background task pushes events in order onto an unbounded queue and
//! finishes with exactly one terminal marker, `Completed` or `Failed`. A panic
//! anywhere in the run, including inside a model's stream, is caught at the
//! task boundary and delivered as `Failed`, so the consumer always observes
//! termination.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use baton_core::RunItem;
use baton_llm::RawResponseEvent;
use futures::{FutureExt, Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error};

use crate::errors::RunError;
use crate::result::RunResult;
use crate::tool_executor::panic_message;

/// One event of a streamed run.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Provider-level delta, forwarded as received.
    RawResponse(RawResponseEvent),
    /// A transcript item was produced.
    RunItem {
        /// Event name, e.g. `tool_called`.
        name: &'static str,
        /// The item.
        item: RunItem,
    },
    /// A different agent became active.
    AgentUpdated {
        /// The new agent.
        agent_name: String,
    },
}

/// Event name for a run item.
pub fn run_item_event_name(item: &RunItem) -> &'static str {
    match item {
        RunItem::MessageOutput { .. } => "message_output_created",
        RunItem::HandoffCall { .. } => "handoff_requested",
        RunItem::HandoffOutput { .. } => "handoff_occurred",
        RunItem::ToolCall { .. } => "tool_called",
        RunItem::ToolCallOutput { .. } => "tool_output",
        RunItem::Reasoning { .. } => "reasoning_item_created",
    }
}

pub(crate) enum QueueItem {
    Event(StreamEvent),
    Completed(Box<RunResult>),
    Failed(RunError),
}

#[derive(Debug, Default)]
struct Progress {
    turn: u32,
    agent: String,
    complete: bool,
}

/// Producer half, held by the run loop.
#[derive(Clone)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<QueueItem>,
    progress: Arc<Mutex<Progress>>,
}

impl EventSink {
    fn send(&self, item: QueueItem) {
        // The consumer may have stopped listening; the run still finishes.
        let _ = self.tx.send(item);
    }

    pub(crate) fn raw(&self, event: RawResponseEvent) {
        self.send(QueueItem::Event(StreamEvent::RawResponse(event)));
    }

    pub(crate) fn items(&self, items: &[RunItem]) {
        for item in items {
            self.send(QueueItem::Event(StreamEvent::RunItem {
                name: run_item_event_name(item),
                item: item.clone(),
            }));
        }
    }

    pub(crate) fn agent_updated(&self, agent_name: &str) {
        self.progress.lock().agent = agent_name.to_owned();
        self.send(QueueItem::Event(StreamEvent::AgentUpdated {
            agent_name: agent_name.to_owned(),
        }));
    }

    pub(crate) fn turn(&self, turn: u32) {
        self.progress.lock().turn = turn;
    }
}

/// Handle to a run executing in the background.
///
/// Drain [`RunResultStreaming::stream_events`] to observe the run. Dropping
/// the handle cancels the run.
pub struct RunResultStreaming {
    rx: mpsc::UnboundedReceiver<QueueItem>,
    progress: Arc<Mutex<Progress>>,
    cancellation: CancellationToken,
    result: Option<RunResult>,
    finished: bool,
}

impl RunResultStreaming {
    /// Spawn `run` on the current runtime. `run` receives the event sink and
    /// resolves to the run's outcome.
    pub(crate) fn spawn<F, Fut>(starting_agent: &str, cancellation: CancellationToken, run: F) -> Self
    where
        F: FnOnce(EventSink) -> Fut,
        Fut: Future<Output = Result<RunResult, RunError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let progress = Arc::new(Mutex::new(Progress {
            agent: starting_agent.to_owned(),
            ..Progress::default()
        }));
        let sink = EventSink {
            tx: tx.clone(),
            progress: Arc::clone(&progress),
        };
        let fut = run(sink);
        let task_progress = Arc::clone(&progress);

        let _ = tokio::spawn(
            async move {
                let outcome = AssertUnwindSafe(fut).catch_unwind().await.unwrap_or_else(|panic| {
                    let message = panic_message(&panic);
                    error!(panic = %message, "streamed run panicked");
                    Err(RunError::internal(format!("run task panicked: {message}")))
                });
                task_progress.lock().complete = true;
                let terminal = match outcome {
                    Ok(result) => QueueItem::Completed(Box::new(result)),
                    Err(e) => QueueItem::Failed(e),
                };
                let _ = tx.send(terminal);
            }
            .in_current_span(),
        );

        Self {
            rx,
            progress,
            cancellation,
            result: None,
            finished: false,
        }
    }

    /// Events in production order. The stream ends after the run finishes;
    /// a failed run ends it with one `Err`.
    pub fn stream_events(&mut self) -> impl Stream<Item = Result<StreamEvent, RunError>> + '_ {
        async_stream::stream! {
            if self.finished {
                return;
            }
            loop {
                match self.rx.recv().await {
                    Some(QueueItem::Event(event)) => yield Ok(event),
                    Some(QueueItem::Completed(result)) => {
                        self.result = Some(*result);
                        self.finished = true;
                        return;
                    }
                    Some(QueueItem::Failed(e)) => {
                        self.finished = true;
                        yield Err(e);
                        return;
                    }
                    None => {
                        self.finished = true;
                        yield Err(RunError::internal("run task ended without a result"));
                        return;
                    }
                }
            }
        }
    }

    /// Turn the run is on.
    pub fn current_turn(&self) -> u32 {
        self.progress.lock().turn
    }

    /// Name of the active agent.
    pub fn current_agent(&self) -> String {
        self.progress.lock().agent.clone()
    }

    /// Whether the background run has finished.
    pub fn is_complete(&self) -> bool {
        self.progress.lock().complete
    }

    /// Stop the run at its next suspension point.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// The result, once the event stream has been drained to completion.
    pub fn final_result(&self) -> Option<&RunResult> {
        self.result.as_ref()
    }

    /// Drain the remaining events and return the result.
    ///
    /// If a previous `stream_events` pass already delivered the run's error,
    /// this returns an internal error instead.
    pub async fn into_result(mut self) -> Result<RunResult, RunError> {
        {
            let events = self.stream_events();
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                let _ = event?;
            }
        }
        self.result
            .take()
            .ok_or_else(|| RunError::internal("run failed; the error was already delivered on the event stream"))
    }
}

impl Drop for RunResultStreaming {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use assert_matches::assert_matches;
    use baton_core::{OutputMessage, RunInput, Usage};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn done(agent: &str) -> RunResult {
        RunResult {
            input: RunInput::from("hi"),
            new_items: Vec::new(),
            raw_responses: Vec::new(),
            final_output: json!("ok"),
            last_agent: Agent::new(agent).shared(),
            input_guardrail_results: Vec::new(),
            output_guardrail_results: Vec::new(),
            usage: Usage::default(),
            usage_by_agent: BTreeMap::new(),
            turns: 1,
        }
    }

    #[test]
    fn item_event_names() {
        let message = RunItem::MessageOutput {
            agent: "a".into(),
            raw: OutputMessage::text("m", "hi"),
        };
        assert_eq!(run_item_event_name(&message), "message_output_created");
    }

    #[tokio::test]
    async fn events_then_result() {
        let mut streamed = RunResultStreaming::spawn("a", CancellationToken::new(), |sink| async move {
            sink.turn(1);
            sink.agent_updated("a");
            sink.raw(RawResponseEvent::Created { response_id: None });
            Ok(done("a"))
        });

        let events: Vec<_> = streamed.stream_events().collect().await;
        assert_eq!(events.len(), 2);
        assert_matches!(&events[0], Ok(StreamEvent::AgentUpdated { agent_name }) if agent_name == "a");
        assert!(streamed.is_complete());
        assert_eq!(streamed.current_turn(), 1);
        assert_eq!(streamed.final_result().unwrap().final_output, json!("ok"));

        let again: Vec<_> = streamed.stream_events().collect().await;
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn panic_becomes_terminal_error() {
        let streamed = RunResultStreaming::spawn("a", CancellationToken::new(), |_sink| async move {
            if true {
                panic!("gateway exploded");
            }
            Ok(done("a"))
        });
        let outcome = tokio::time::timeout(Duration::from_secs(5), streamed.into_result())
            .await
            .unwrap();
        assert_matches!(outcome, Err(RunError::Internal { ref message }) if message.contains("gateway exploded"));
    }

    #[tokio::test]
    async fn drop_cancels_run() {
        let token = CancellationToken::new();
        let observed = token.clone();
        let streamed = RunResultStreaming::spawn("a", token, |_sink| async move {
            futures::future::pending::<()>().await;
            Ok(done("a"))
        });
        streamed.cancel();
        assert!(observed.is_cancelled());
        drop(streamed);
    }
}
