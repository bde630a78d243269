//! Run tracing.
//!
//! Spans are plain `tracing` spans. A run opens one `workflow` span unless an
//! ambient trace is active, with `agent`, `generation`, `function`,
//! `computer_action` and `handoff` spans beneath it. When tracing is disabled
//! every span is [`Span::none`], so instrumentation disappears while the run
//! behaves identically.

use std::future::Future;

use baton_core::ids;
use tracing::{Instrument, Span, field, info_span};

/// An ambient trace shared by several runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceInfo {
    /// Trace identifier.
    pub trace_id: String,
    /// Workflow name.
    pub workflow_name: String,
    /// Optional grouping id, e.g. a conversation thread.
    pub group_id: Option<String>,
}

tokio::task_local! {
    static ACTIVE_TRACE: TraceInfo;
}

/// The ambient trace of the current task, if one is active.
pub fn current_trace() -> Option<TraceInfo> {
    ACTIVE_TRACE.try_with(Clone::clone).ok()
}

/// Run `fut` inside one ambient trace. Runs started inside reuse it instead
/// of opening their own `workflow` span.
pub async fn with_trace<F: Future>(workflow_name: impl Into<String>, fut: F) -> F::Output {
    let info = TraceInfo {
        trace_id: ids::trace_id(),
        workflow_name: workflow_name.into(),
        group_id: None,
    };
    let span = info_span!("workflow", workflow = %info.workflow_name, trace_id = %info.trace_id);
    ACTIVE_TRACE.scope(info, fut).instrument(span).await
}

/// Run `fut` under `trace`, if any. Tasks do not inherit the ambient trace,
/// so spawned runs carry it over explicitly.
pub(crate) async fn within<F: Future>(trace: Option<TraceInfo>, fut: F) -> F::Output {
    match trace {
        Some(info) => ACTIVE_TRACE.scope(info, fut).await,
        None => fut.await,
    }
}

/// Span factory honouring the run's tracing switches.
#[derive(Clone, Copy, Debug)]
pub struct Tracer {
    enabled: bool,
    sensitive: bool,
}

impl Tracer {
    /// Tracer for a run.
    pub fn new(enabled: bool, include_sensitive_data: bool) -> Self {
        Self {
            enabled,
            sensitive: include_sensitive_data,
        }
    }

    /// Whether spans are emitted.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether inputs and outputs may be recorded.
    pub fn records_data(&self) -> bool {
        self.enabled && self.sensitive
    }

    /// Top-level span of a run.
    pub fn workflow(&self, workflow_name: &str, trace_id: &str, group_id: Option<&str>) -> Span {
        if !self.enabled {
            return Span::none();
        }
        info_span!("workflow", workflow = workflow_name, trace_id, group_id = ?group_id)
    }

    /// One agent activation.
    pub fn agent(&self, agent_name: &str, tools: &[String], handoffs: &[String], output_type: &str) -> Span {
        if !self.enabled {
            return Span::none();
        }
        info_span!(
            "agent",
            agent = agent_name,
            tools = ?tools,
            handoffs = ?handoffs,
            output_type,
        )
    }

    /// One model call. Usage and, if allowed, output are recorded on completion.
    pub fn generation(&self, agent_name: &str, model: &str, turn: u32) -> Span {
        if !self.enabled {
            return Span::none();
        }
        info_span!(
            "generation",
            agent = agent_name,
            model,
            turn,
            input_tokens = field::Empty,
            output_tokens = field::Empty,
        )
    }

    /// One function tool call.
    pub fn function(&self, tool_name: &str, call_id: &str, arguments: &str) -> Span {
        if !self.enabled {
            return Span::none();
        }
        let span = info_span!("function", tool_name, call_id, input = field::Empty, output = field::Empty);
        if self.sensitive {
            let _ = span.record("input", arguments);
        }
        span
    }

    /// One computer action.
    pub fn computer_action(&self, call_id: &str, action: &str) -> Span {
        if !self.enabled {
            return Span::none();
        }
        info_span!("computer_action", call_id, action)
    }

    /// One handoff.
    pub fn handoff(&self, from_agent: &str, to_agent: &str) -> Span {
        if !self.enabled {
            return Span::none();
        }
        info_span!("handoff", from_agent, to_agent)
    }

    /// Record a tool's output on its `function` span when allowed.
    pub fn record_output(&self, span: &Span, output: &str) {
        if self.records_data() {
            let _ = span.record("output", output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::logging::capture_logs;

    #[test]
    fn disabled_tracer_emits_nothing() {
        let (logs, _guard) = capture_logs();
        let tracer = Tracer::new(false, true);
        let span = tracer.function("search", "call_1", "{}");
        tracer.record_output(&span, "secret");
        let _ = tracer.workflow("wf", "trace_1", None);
        assert!(logs.spans().is_empty());
    }

    #[test]
    fn sensitive_data_is_opt_in() {
        let (logs, _guard) = capture_logs();
        let span = Tracer::new(true, false).function("search", "call_1", r#"{"q":"x"}"#);
        Tracer::new(true, false).record_output(&span, "result");
        let captured = &logs.spans_named("function")[0];
        assert_eq!(captured.field("tool_name"), Some("search"));
        assert!(captured.field("input").is_none());
        assert!(captured.field("output").is_none());

        let span = Tracer::new(true, true).function("search", "call_2", r#"{"q":"x"}"#);
        Tracer::new(true, true).record_output(&span, "result");
        let captured = &logs.spans_named("function")[1];
        assert_eq!(captured.field("input"), Some(r#"{"q":"x"}"#));
        assert_eq!(captured.field("output"), Some("result"));
    }

    #[tokio::test]
    async fn ambient_trace_is_visible_inside_scope() {
        assert!(current_trace().is_none());
        let name = with_trace("support flow", async { current_trace().map(|t| t.workflow_name) }).await;
        assert_eq!(name.as_deref(), Some("support flow"));
        assert!(current_trace().is_none());
    }
}
