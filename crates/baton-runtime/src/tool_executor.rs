//! Concurrent tool execution for one turn.
//!
//! Every function call is its own unit on a [`JoinSet`]; all computer actions
//! of the turn form one more unit that runs them in model order against the
//! shared device. Each unit catches its own panic. The first fatal error
//! shuts the set down, so no tool outlives the turn that started it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use baton_core::{InputItem, RunContext, RunItem};
use baton_hooks::{HookEngine, HookEvent};
use baton_tools::{FailurePolicy, ToolContext, ToolError, invoke_function_tool, output_text};
use futures::FutureExt;
use serde_json::Value;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, warn};

use crate::agent::Agent;
use crate::errors::RunError;
use crate::response_processor::{ToolRunComputer, ToolRunFunction};
use crate::trace::{self, Tracer, current_trace};
use crate::turn::FunctionToolResult;

/// Prefix of the output reported to the model when a tool fails.
pub const TOOL_ERROR_MESSAGE: &str = "An error occurred while running the tool. Please try again. Error:";

/// What each tool unit needs from the running turn.
#[derive(Clone)]
pub struct ToolRunEnv {
    /// Caller context.
    pub ctx: RunContext,
    /// Active agent.
    pub agent: Arc<Agent>,
    /// Run-scoped hooks.
    pub hooks: HookEngine,
    /// Span factory.
    pub tracer: Tracer,
    /// Current turn.
    pub turn: u32,
    /// Run cancellation.
    pub cancellation: CancellationToken,
}

/// Outputs of one turn's tools.
#[derive(Clone, Debug, Default)]
pub struct ExecutedTools {
    /// Function results in call order.
    pub functions: Vec<FunctionToolResult>,
    /// Computer output items in call order.
    pub computer_items: Vec<RunItem>,
}

impl ExecutedTools {
    /// Transcript items ordered as the model made the calls. Outputs whose
    /// call id is not in `call_order` go last.
    pub fn items(&self, call_order: &[String]) -> Vec<RunItem> {
        let mut items: Vec<RunItem> = self
            .functions
            .iter()
            .map(|r| r.run_item.clone())
            .chain(self.computer_items.iter().cloned())
            .collect();
        items.sort_by_key(|item| {
            item.call_id()
                .and_then(|id| call_order.iter().position(|c| c == id))
                .unwrap_or(usize::MAX)
        });
        items
    }
}

enum UnitOutput {
    Function(FunctionToolResult),
    Computer(Vec<RunItem>),
}

/// Run every pending tool of a turn concurrently and join the results.
pub async fn execute_tools(
    env: &ToolRunEnv,
    functions: Vec<ToolRunFunction>,
    computer_actions: Vec<ToolRunComputer>,
) -> Result<ExecutedTools, RunError> {
    let function_count = functions.len();
    // Spawned units do not inherit the task-local trace.
    let ambient = current_trace();
    let mut set = JoinSet::new();

    for (index, run) in functions.into_iter().enumerate() {
        let env = env.clone();
        let tool_name = run.call.name.clone();
        let call_id = run.call.call_id.clone();
        let _ = set.spawn(
            trace::within(ambient.clone(), async move {
                let turn = env.turn;
                let outcome = AssertUnwindSafe(run_function(env, run))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(panicked(turn, &tool_name, &call_id, &panic)));
                (index, outcome.map(UnitOutput::Function))
            })
            .in_current_span(),
        );
    }

    if let Some(first) = computer_actions.first() {
        let env = env.clone();
        let tool_name = first.tool.name().to_owned();
        let call_id = first.call.call_id.clone();
        let _ = set.spawn(
            trace::within(ambient, async move {
                let turn = env.turn;
                let outcome = AssertUnwindSafe(run_computer_actions(env, computer_actions))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(panicked(turn, &tool_name, &call_id, &panic)));
                (function_count, outcome.map(UnitOutput::Computer))
            })
            .in_current_span(),
        );
    }

    let mut slots: Vec<Option<FunctionToolResult>> = (0..function_count).map(|_| None).collect();
    let mut computer_items = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (index, outcome) = match joined {
            Ok(unit) => unit,
            Err(e) => {
                set.shutdown().await;
                return Err(RunError::internal(format!("tool task failed: {e}")));
            }
        };
        match outcome {
            Ok(UnitOutput::Function(result)) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(result);
                }
            }
            Ok(UnitOutput::Computer(items)) => computer_items = items,
            Err(e) => {
                debug!(error = %e, "fatal tool error, stopping remaining tools");
                set.shutdown().await;
                return Err(e);
            }
        }
    }

    Ok(ExecutedTools {
        functions: slots.into_iter().flatten().collect(),
        computer_items,
    })
}

async fn run_function(env: ToolRunEnv, run: ToolRunFunction) -> Result<FunctionToolResult, RunError> {
    let ToolRunFunction { call, tool } = run;
    let agent_name = env.agent.name().to_owned();

    env.hooks
        .emit(
            &env.ctx,
            env.agent.hooks(),
            &HookEvent::ToolStart {
                agent: agent_name.clone(),
                tool_name: call.name.clone(),
                call_id: call.call_id.clone(),
            },
        )
        .await?;

    let tool_ctx = ToolContext {
        run_context: env.ctx.clone(),
        agent_name: agent_name.clone(),
        tool_call_id: call.call_id.clone(),
        cancellation: env.cancellation.clone(),
    };
    let span = env.tracer.function(&call.name, &call.call_id, &call.arguments);
    let outcome = invoke_function_tool(tool.as_ref(), &tool_ctx, &call.arguments)
        .instrument(span.clone())
        .await;

    let output = match outcome {
        Ok(value) => value,
        Err(e)
            if matches!(e, ToolError::Cancelled)
                || e.is_configuration()
                || tool.failure_policy() == FailurePolicy::Fail =>
        {
            return Err(RunError::from_tool(env.turn, &call.name, &call.call_id, e));
        }
        Err(e) => {
            warn!(tool_name = %call.name, call_id = %call.call_id, error = %e, category = e.category(), "tool failed, reporting to model");
            Value::String(format!("{TOOL_ERROR_MESSAGE} {e}"))
        }
    };
    let text = output_text(&output);
    env.tracer.record_output(&span, &text);

    env.hooks
        .emit(
            &env.ctx,
            env.agent.hooks(),
            &HookEvent::ToolEnd {
                agent: agent_name.clone(),
                tool_name: call.name.clone(),
                call_id: call.call_id.clone(),
                output: text.clone(),
            },
        )
        .await?;

    Ok(FunctionToolResult {
        tool_name: call.name,
        call_id: call.call_id.clone(),
        output: output.clone(),
        ends_run: tool.ends_run(),
        run_item: RunItem::ToolCallOutput {
            agent: agent_name,
            call_id: call.call_id.clone(),
            output,
            raw: InputItem::FunctionCallOutput {
                call_id: call.call_id,
                output: text,
            },
        },
    })
}

async fn run_computer_actions(env: ToolRunEnv, actions: Vec<ToolRunComputer>) -> Result<Vec<RunItem>, RunError> {
    let agent_name = env.agent.name().to_owned();
    let mut items = Vec::with_capacity(actions.len());

    for ToolRunComputer { call, tool } in actions {
        let tool_name = tool.name();
        env.hooks
            .emit(
                &env.ctx,
                env.agent.hooks(),
                &HookEvent::ToolStart {
                    agent: agent_name.clone(),
                    tool_name: tool_name.to_owned(),
                    call_id: call.call_id.clone(),
                },
            )
            .await?;

        let span = env.tracer.computer_action(&call.call_id, call.action.kind());
        let outcome = async {
            tokio::select! {
                biased;
                () = env.cancellation.cancelled() => Err(ToolError::Cancelled),
                result = tool.run(&call) => result,
            }
        }
        .instrument(span)
        .await;
        let output = outcome.map_err(|e| RunError::from_tool(env.turn, tool_name, &call.call_id, e))?;

        env.hooks
            .emit(
                &env.ctx,
                env.agent.hooks(),
                &HookEvent::ToolEnd {
                    agent: agent_name.clone(),
                    tool_name: tool_name.to_owned(),
                    call_id: call.call_id.clone(),
                    output: output.image_url.clone(),
                },
            )
            .await?;

        items.push(RunItem::ToolCallOutput {
            agent: agent_name.clone(),
            call_id: call.call_id.clone(),
            output: Value::String(output.image_url.clone()),
            raw: InputItem::ComputerCallOutput {
                call_id: call.call_id,
                image_url: output.image_url,
                acknowledged_safety_checks: output.acknowledged_safety_checks,
            },
        });
    }
    Ok(items)
}

fn panicked(turn: u32, tool_name: &str, call_id: &str, panic: &Box<dyn Any + Send>) -> RunError {
    let message = panic_message(panic);
    warn!(tool_name, call_id, panic = %message, "tool panicked");
    RunError::from_tool(turn, tool_name, call_id, ToolError::execution(format!("tool panicked: {message}")))
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_owned()
}
