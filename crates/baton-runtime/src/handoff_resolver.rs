//! Carrying out a requested handoff.

use std::sync::Arc;

use baton_core::{InputItem, RunContext, RunItem};
use baton_hooks::{HookEngine, HookEvent};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};

use crate::agent::Agent;
use crate::errors::RunError;
use crate::handoff::HandoffInputFilter;
use crate::response_processor::ToolRunHandoff;
use crate::trace::Tracer;

/// Output given to every handoff call after the first in one turn.
pub const MULTIPLE_HANDOFFS_MESSAGE: &str = "Multiple handoffs detected, ignoring this one.";

/// Result of a handoff.
#[derive(Clone)]
pub struct HandoffOutcome {
    /// Agent that takes over.
    pub new_agent: Arc<Agent>,
    /// Items to append: outputs for ignored handoff calls, then the handoff output.
    pub items: Vec<RunItem>,
    /// Transcript filter to apply for the new agent.
    pub input_filter: Option<HandoffInputFilter>,
}

/// Honor the first of `requested` and answer the rest as ignored.
#[allow(clippy::too_many_arguments)]
pub async fn execute_handoffs(
    ctx: &RunContext,
    agent: &Agent,
    hooks: &HookEngine,
    tracer: Tracer,
    requested: Vec<ToolRunHandoff>,
    fallback_filter: Option<&HandoffInputFilter>,
    cancellation: &CancellationToken,
) -> Result<HandoffOutcome, RunError> {
    let mut requested = requested.into_iter();
    let Some(chosen) = requested.next() else {
        return Err(RunError::internal("no handoff to execute"));
    };

    let mut items = Vec::new();
    for ignored in requested {
        warn!(agent = agent.name(), handoff = %ignored.call.name, "multiple handoffs in one turn, ignoring");
        items.push(RunItem::ToolCallOutput {
            agent: agent.name().to_owned(),
            call_id: ignored.call.call_id.clone(),
            output: Value::String(MULTIPLE_HANDOFFS_MESSAGE.to_owned()),
            raw: InputItem::FunctionCallOutput {
                call_id: ignored.call.call_id,
                output: MULTIPLE_HANDOFFS_MESSAGE.to_owned(),
            },
        });
    }

    let ToolRunHandoff { call, handoff } = chosen;
    let span = tracer.handoff(agent.name(), handoff.agent_name());
    let new_agent = async {
        tokio::select! {
            biased;
            () = cancellation.cancelled() => Err(RunError::Cancelled),
            result = handoff.invoke(ctx, &call.arguments) => result,
        }
    }
    .instrument(span)
    .await?;
    info!(from = agent.name(), to = new_agent.name(), "handoff");

    items.push(RunItem::HandoffOutput {
        agent: agent.name().to_owned(),
        raw: InputItem::FunctionCallOutput {
            call_id: call.call_id,
            output: json!({ "assistant": new_agent.name() }).to_string(),
        },
        source_agent: agent.name().to_owned(),
        target_agent: new_agent.name().to_owned(),
    });

    hooks
        .emit(
            ctx,
            new_agent.hooks(),
            &HookEvent::Handoff {
                from: agent.name().to_owned(),
                to: new_agent.name().to_owned(),
            },
        )
        .await?;

    Ok(HandoffOutcome {
        new_agent,
        items,
        input_filter: handoff.input_filter().or(fallback_filter).cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::{Handoff, HandoffInputData, handoff};
    use assert_matches::assert_matches;
    use baton_core::FunctionCall;
    use baton_hooks::{LifecycleHooks, RecordingHooks};

    fn request(h: Handoff, call_id: &str) -> ToolRunHandoff {
        ToolRunHandoff {
            call: FunctionCall {
                id: format!("fc_{call_id}"),
                call_id: call_id.into(),
                name: h.tool_name().to_owned(),
                arguments: "{}".into(),
            },
            handoff: h,
        }
    }

    async fn resolve(requested: Vec<ToolRunHandoff>, hooks: &HookEngine) -> Result<HandoffOutcome, RunError> {
        execute_handoffs(
            &RunContext::empty(),
            &Agent::new("triage"),
            hooks,
            Tracer::new(false, false),
            requested,
            None,
            &CancellationToken::new(),
        )
        .await
    }

    #[tokio::test]
    async fn single_handoff_produces_output_item() {
        let billing = Agent::new("billing").shared();
        let outcome = resolve(vec![request(handoff(billing), "c1")], &HookEngine::default())
            .await
            .unwrap();
        assert_eq!(outcome.new_agent.name(), "billing");
        assert_eq!(outcome.items.len(), 1);
        assert_matches!(&outcome.items[0], RunItem::HandoffOutput { raw: InputItem::FunctionCallOutput { call_id, output }, source_agent, target_agent, .. }
            if call_id == "c1" && output == r#"{"assistant":"billing"}"# && source_agent == "triage" && target_agent == "billing");
    }

    #[tokio::test]
    async fn only_first_of_several_is_honored() {
        let outcome = resolve(
            vec![
                request(handoff(Agent::new("billing").shared()), "c1"),
                request(handoff(Agent::new("refunds").shared()), "c2"),
            ],
            &HookEngine::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.new_agent.name(), "billing");
        assert_matches!(&outcome.items[0], RunItem::ToolCallOutput { call_id, output, .. }
            if call_id == "c2" && output == &Value::String(MULTIPLE_HANDOFFS_MESSAGE.into()));
        assert_matches!(&outcome.items[1], RunItem::HandoffOutput { .. });
    }

    #[tokio::test]
    async fn handoff_hook_goes_to_run_then_target_agent() {
        let log = RecordingHooks::shared_log();
        let run_hooks: Arc<dyn LifecycleHooks> = Arc::new(RecordingHooks::with_log("run", log.clone()));
        let target_hooks: Arc<dyn LifecycleHooks> = Arc::new(RecordingHooks::with_log("billing", log.clone()));
        let billing = Agent::new("billing").with_hooks(target_hooks).shared();

        let _ = resolve(vec![request(handoff(billing), "c1")], &HookEngine::new(Some(run_hooks)))
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec!["run:handoff:triage->billing", "billing:handoff:triage->billing"]);
    }

    #[tokio::test]
    async fn descriptor_filter_wins_over_fallback() {
        let own: HandoffInputFilter = Arc::new(|mut data: HandoffInputData| {
            data.new_items.clear();
            data
        });
        let fallback: HandoffInputFilter = Arc::new(|data| data);
        let h = handoff(Agent::new("billing").shared()).with_input_filter(Arc::clone(&own));
        let outcome = execute_handoffs(
            &RunContext::empty(),
            &Agent::new("triage"),
            &HookEngine::default(),
            Tracer::new(false, false),
            vec![request(h, "c1")],
            Some(&fallback),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(Arc::ptr_eq(&outcome.input_filter.unwrap(), &own));
    }

    #[tokio::test]
    async fn transfer_errors_abort() {
        let h = Handoff::new("transfer_to_x", "x", "x", |_ctx, _args| async {
            Err(RunError::user("x is offline"))
        });
        let err = resolve(vec![request(h, "c1")], &HookEngine::default()).await.err().unwrap();
        assert_matches!(err, RunError::User { .. });
    }
}
