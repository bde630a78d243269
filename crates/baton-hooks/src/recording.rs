//! A hook implementation that records every event it sees.

use std::sync::Arc;

use async_trait::async_trait;
use baton_core::RunContext;
use parking_lot::Mutex;

use crate::errors::HookError;
use crate::handler::LifecycleHooks;
use crate::types::HookEvent;

/// Shared event log, one `scope:kind:agent` line per event.
pub type HookLog = Arc<Mutex<Vec<String>>>;

/// Records events; optionally fails on one event kind.
pub struct RecordingHooks {
    scope: String,
    log: HookLog,
    events: Mutex<Vec<HookEvent>>,
    fail_on: Option<&'static str>,
}

impl RecordingHooks {
    /// A fresh shared log.
    pub fn shared_log() -> HookLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// Record into a private log.
    pub fn new(scope: impl Into<String>) -> Self {
        Self::with_log(scope, Self::shared_log())
    }

    /// Record into `log`, interleaving with other recorders sharing it.
    pub fn with_log(scope: impl Into<String>, log: HookLog) -> Self {
        Self {
            scope: scope.into(),
            log,
            events: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Fail when an event of `kind` arrives.
    #[must_use]
    pub fn failing_on(mut self, kind: &'static str) -> Self {
        self.fail_on = Some(kind);
        self
    }

    /// Lines recorded so far (shared log).
    pub fn lines(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Events this recorder received.
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl LifecycleHooks for RecordingHooks {
    fn name(&self) -> &str {
        &self.scope
    }

    async fn on_event(&self, _ctx: &RunContext, event: &HookEvent) -> Result<(), HookError> {
        let line = match event {
            HookEvent::ToolStart { tool_name, .. } | HookEvent::ToolEnd { tool_name, .. } => {
                format!("{}:{}:{}", self.scope, event.kind(), tool_name)
            }
            HookEvent::Handoff { from, to } => format!("{}:handoff:{from}->{to}", self.scope),
            _ => format!("{}:{}:{}", self.scope, event.kind(), event.agent()),
        };
        self.log.lock().push(line);
        self.events.lock().push(event.clone());

        if self.fail_on == Some(event.kind()) {
            return Err(HookError::handler(&self.scope, format!("refused {}", event.kind())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_tool_events_by_tool_name() {
        let hooks = RecordingHooks::new("run");
        hooks
            .on_event(
                &RunContext::empty(),
                &HookEvent::ToolEnd {
                    agent: "a".into(),
                    tool_name: "search".into(),
                    call_id: "c".into(),
                    output: "ok".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(hooks.lines(), vec!["run:tool_end:search"]);
        assert_eq!(hooks.events().len(), 1);
    }

    #[tokio::test]
    async fn records_handoffs_with_both_agents() {
        let hooks = RecordingHooks::new("run");
        hooks
            .on_event(
                &RunContext::empty(),
                &HookEvent::Handoff {
                    from: "a".into(),
                    to: "b".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(hooks.lines(), vec!["run:handoff:a->b"]);
    }
}
