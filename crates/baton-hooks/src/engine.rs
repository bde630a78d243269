//! Ordered hook dispatch.

use std::sync::Arc;

use baton_core::RunContext;
use tracing::{debug, warn};

use crate::errors::HookError;
use crate::handler::LifecycleHooks;
use crate::types::HookEvent;

/// Dispatches events to the run-scoped hooks, then to the agent-scoped hooks.
#[derive(Clone, Default)]
pub struct HookEngine {
    run_hooks: Option<Arc<dyn LifecycleHooks>>,
}

impl HookEngine {
    /// Engine with optional run-scoped hooks.
    pub fn new(run_hooks: Option<Arc<dyn LifecycleHooks>>) -> Self {
        Self { run_hooks }
    }

    /// Whether run-scoped hooks are installed.
    pub fn has_run_hooks(&self) -> bool {
        self.run_hooks.is_some()
    }

    /// Fire `event` on the run hooks, then on `agent_hooks`.
    ///
    /// Stops at the first error.
    pub async fn emit(
        &self,
        ctx: &RunContext,
        agent_hooks: Option<&Arc<dyn LifecycleHooks>>,
        event: &HookEvent,
    ) -> Result<(), HookError> {
        for hooks in self.run_hooks.iter().chain(agent_hooks) {
            debug!(hook = hooks.name(), event = event.kind(), agent = event.agent(), "dispatching hook");
            if let Err(e) = hooks.on_event(ctx, event).await {
                warn!(hook = hooks.name(), event = event.kind(), error = %e, "hook failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingHooks;
    use assert_matches::assert_matches;

    fn start() -> HookEvent {
        HookEvent::AgentStart { agent: "a".into() }
    }

    #[tokio::test]
    async fn run_hooks_fire_before_agent_hooks() {
        let log = RecordingHooks::shared_log();
        let run: Arc<dyn LifecycleHooks> = Arc::new(RecordingHooks::with_log("run", log.clone()));
        let agent: Arc<dyn LifecycleHooks> = Arc::new(RecordingHooks::with_log("agent", log.clone()));

        let engine = HookEngine::new(Some(run));
        engine.emit(&RunContext::empty(), Some(&agent), &start()).await.unwrap();

        assert_eq!(*log.lock(), vec!["run:agent_start:a", "agent:agent_start:a"]);
    }

    #[tokio::test]
    async fn no_hooks_is_a_no_op() {
        let engine = HookEngine::default();
        assert!(!engine.has_run_hooks());
        engine.emit(&RunContext::empty(), None, &start()).await.unwrap();
    }

    #[tokio::test]
    async fn run_hook_error_skips_agent_hooks() {
        let log = RecordingHooks::shared_log();
        let run: Arc<dyn LifecycleHooks> =
            Arc::new(RecordingHooks::with_log("run", log.clone()).failing_on("agent_start"));
        let agent: Arc<dyn LifecycleHooks> = Arc::new(RecordingHooks::with_log("agent", log.clone()));

        let err = HookEngine::new(Some(run))
            .emit(&RunContext::empty(), Some(&agent), &start())
            .await
            .unwrap_err();
        assert_matches!(err, HookError::Handler { ref name, .. } if name == "run");
        assert_eq!(*log.lock(), vec!["run:agent_start:a"]);
    }
}
