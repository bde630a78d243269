//! The turn loop.
//!
//! [`Runner::run`] drives one run to completion on the caller's task;
//! [`Runner::run_streamed`] drives the same loop on a background task and
//! publishes its progress as [`StreamEvent`](crate::streaming::StreamEvent)s.
//!
//! Per turn: assemble the agent's tools, call the model, classify the
//! response, run the turn's tools concurrently, then either hand off, finish,
//! or go around again. Any error aborts the run; nothing is retried here.

use std::collections::BTreeMap;
use std::future::Future;
use std::mem;
use std::sync::Arc;

use baton_core::{InputItem, ItemHelpers, ModelResponse, RunContext, RunInput, RunItem, Usage, ids};
use baton_guardrails::{GuardrailEngine, GuardrailResult, InputGuardrail, OutputGuardrail};
use baton_hooks::{HookEngine, HookEvent};
use baton_llm::{Model, ModelError, ModelRequest, ModelResult, ModelSettings, ModelStreamEvent, ModelTracing};
use baton_tools::{Tool, ToolError, ToolRegistry, collect_mcp_tools};
use futures::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, warn};

use crate::agent::Agent;
use crate::config::RunConfig;
use crate::errors::{GuardrailStage, RunError};
use crate::handoff::{Handoff, HandoffInputData, HandoffInputFilter};
use crate::handoff_resolver::execute_handoffs;
use crate::response_processor::process_model_response;
use crate::result::RunResult;
use crate::streaming::{EventSink, RunResultStreaming};
use crate::tool_executor::{ExecutedTools, ToolRunEnv, execute_tools};
use crate::trace::{self, TraceInfo, Tracer, current_trace};
use crate::turn::{AgentToolUseTracker, NextStep, final_output_from_tools};

/// Entry points for running agents.
pub struct Runner;

impl Runner {
    /// Run `starting_agent` on `input` until it produces a final output.
    pub async fn run(
        ctx: RunContext,
        starting_agent: Arc<Agent>,
        input: impl Into<RunInput>,
        config: RunConfig,
    ) -> Result<RunResult, RunError> {
        RunLoop::new(ctx, starting_agent, input.into(), config, None)
            .execute()
            .await
    }

    /// Run `starting_agent` on a background task, streaming its events.
    ///
    /// The run is cancelled when the caller's token is cancelled, when
    /// [`RunResultStreaming::cancel`] is called, or when the handle is dropped.
    pub fn run_streamed(
        ctx: RunContext,
        starting_agent: Arc<Agent>,
        input: impl Into<RunInput>,
        config: RunConfig,
    ) -> RunResultStreaming {
        let token = config.cancellation.child_token();
        let config = config.with_cancellation(token.clone());
        let input = input.into();
        let name = starting_agent.name().to_owned();
        let ambient = current_trace();
        RunResultStreaming::spawn(&name, token, move |sink| {
            trace::within(ambient, RunLoop::new(ctx, starting_agent, input, config, Some(sink)).execute())
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run state
// ─────────────────────────────────────────────────────────────────────────────

enum Activation {
    Finished(Box<RunResult>),
    Handoff(Arc<Agent>),
}

struct RunLoop {
    ctx: RunContext,
    config: RunConfig,
    hooks: HookEngine,
    tracer: Tracer,
    guardrails: GuardrailEngine,
    sink: Option<EventSink>,
    starting_agent: Arc<Agent>,
    input: RunInput,
    /// Model-facing input history; rewritten by handoff filters.
    history: Vec<InputItem>,
    /// Model-facing generated items; rewritten by handoff filters.
    model_items: Vec<RunItem>,
    /// Every generated item, never filtered.
    new_items: Vec<RunItem>,
    raw_responses: Vec<ModelResponse>,
    usage: Usage,
    usage_by_agent: BTreeMap<String, Usage>,
    input_guardrail_results: Vec<GuardrailResult>,
    tracker: AgentToolUseTracker,
    turn: u32,
    previous_response_id: Option<String>,
}

impl RunLoop {
    fn new(
        ctx: RunContext,
        starting_agent: Arc<Agent>,
        input: RunInput,
        config: RunConfig,
        sink: Option<EventSink>,
    ) -> Self {
        let tracer = Tracer::new(!config.tracing_disabled, config.trace_include_sensitive_data);
        Self {
            ctx,
            hooks: HookEngine::new(config.hooks.clone()),
            tracer,
            guardrails: GuardrailEngine::new(tracer.enabled()),
            sink,
            starting_agent,
            history: input.to_items(),
            input,
            model_items: Vec::new(),
            new_items: Vec::new(),
            raw_responses: Vec::new(),
            usage: Usage::default(),
            usage_by_agent: BTreeMap::new(),
            input_guardrail_results: Vec::new(),
            tracker: AgentToolUseTracker::default(),
            turn: 0,
            previous_response_id: config.previous_response_id.clone(),
            config,
        }
    }

    async fn execute(mut self) -> Result<RunResult, RunError> {
        let (span, opened) = self.workflow_span();
        let outcome = trace::within(opened, self.drive()).instrument(span).await;
        match &outcome {
            Ok(result) => info!(agent = result.last_agent_name(), turns = result.turns, "run finished"),
            Err(e) => warn!(turn = self.turn, error = %e, category = e.category(), "run failed"),
        }
        outcome
    }

    /// The run's workflow span. A trace opened here is returned so nested
    /// runs, e.g. agents called as tools, join it instead of opening their own.
    fn workflow_span(&self) -> (Span, Option<TraceInfo>) {
        if !self.tracer.enabled() {
            return (Span::none(), None);
        }
        if current_trace().is_some() {
            return (Span::current(), None);
        }
        let info = TraceInfo {
            trace_id: self.config.trace_id.clone().unwrap_or_else(ids::trace_id),
            workflow_name: self.config.workflow_name.clone(),
            group_id: self.config.group_id.clone(),
        };
        let span = self
            .tracer
            .workflow(&info.workflow_name, &info.trace_id, info.group_id.as_deref());
        (span, Some(info))
    }

    async fn drive(&mut self) -> Result<RunResult, RunError> {
        let mut agent = Arc::clone(&self.starting_agent);
        loop {
            let span = self.agent_span(&agent);
            match self.run_activation(&agent).instrument(span).await? {
                Activation::Finished(result) => return Ok(*result),
                Activation::Handoff(next) => agent = next,
            }
        }
    }

    fn agent_span(&self, agent: &Agent) -> Span {
        let tools: Vec<String> = agent.tools().iter().map(|t| Tool::name(t).to_owned()).collect();
        let handoffs: Vec<String> = agent
            .enabled_handoffs(&self.ctx)
            .iter()
            .map(|h| h.tool_name().to_owned())
            .collect();
        self.tracer
            .agent(agent.name(), &tools, &handoffs, agent.output_type().label())
    }

    /// One agent's stretch of the run, from its start hooks to a handoff or
    /// the final output.
    async fn run_activation(&mut self, agent: &Arc<Agent>) -> Result<Activation, RunError> {
        self.hooks
            .emit(
                &self.ctx,
                agent.hooks(),
                &HookEvent::AgentStart {
                    agent: agent.name().to_owned(),
                },
            )
            .await?;
        if let Some(sink) = &self.sink {
            sink.agent_updated(agent.name());
        }

        loop {
            match self.run_turn(agent).await? {
                NextStep::RunAgain => {}
                NextStep::Handoff(next) => return Ok(Activation::Handoff(next)),
                NextStep::FinalOutput(output) => {
                    return self.finish(agent, output).await.map(|r| Activation::Finished(Box::new(r)));
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // One turn
    // ─────────────────────────────────────────────────────────────────────

    async fn run_turn(&mut self, agent: &Arc<Agent>) -> Result<NextStep, RunError> {
        if self.config.cancellation.is_cancelled() {
            return Err(RunError::Cancelled);
        }
        self.turn += 1;
        if self.turn > self.config.max_turns {
            warn!(agent = agent.name(), max_turns = self.config.max_turns, "turn budget exhausted");
            return Err(RunError::MaxTurnsExceeded {
                max_turns: self.config.max_turns,
            });
        }
        if let Some(sink) = &self.sink {
            sink.turn(self.turn);
        }
        debug!(agent = agent.name(), turn = self.turn, "turn started");

        if self.turn == 1 {
            self.run_input_guardrails(agent).await?;
        }

        let registry = self.assemble_tools(agent).await?;
        let handoffs = agent.enabled_handoffs(&self.ctx);
        let (instructions, prompt) = agent.resolve_instructions(&self.ctx).await;
        let model = self.config.resolve_model(agent, self.turn)?;

        let request = ModelRequest {
            system_instructions: instructions.clone(),
            prompt,
            input: self.model_input(),
            settings: self.model_settings(agent),
            tools: registry.specs(),
            output_schema: agent.output_type().spec(),
            handoffs: handoffs.iter().map(Handoff::spec).collect(),
            previous_response_id: self.previous_response_id.clone(),
            tracing: self.model_tracing(),
        };

        self.hooks
            .emit(
                &self.ctx,
                agent.hooks(),
                &HookEvent::LlmStart {
                    agent: agent.name().to_owned(),
                    system_prompt: instructions,
                    input_items: request.input.len(),
                },
            )
            .await?;
        let response = self.call_model(agent, model.as_ref(), &request).await?;
        self.record_usage(agent.name(), &response.usage);
        self.hooks
            .emit(
                &self.ctx,
                agent.hooks(),
                &HookEvent::LlmEnd {
                    agent: agent.name().to_owned(),
                    response: response.clone(),
                },
            )
            .await?;
        self.previous_response_id = response
            .response_id
            .clone()
            .or_else(|| self.config.previous_response_id.clone());

        let processed = process_model_response(agent.name(), &registry, &response, &handoffs)?;
        self.raw_responses.push(response);
        self.tracker.add_tool_use(agent.name(), &processed.tools_used);

        let turn_start = self.model_items.len();
        let has_tools = processed.has_tools_to_run();
        let tools_end_run = processed.tools_end_run;
        let call_order = processed.tool_call_order();
        let message_text = processed.new_items.iter().rev().find_map(|item| match item {
            RunItem::MessageOutput { raw, .. } => Some(ItemHelpers::text_message_output(raw)),
            _ => None,
        });
        self.push_items(processed.new_items);

        let executed = if has_tools {
            let env = ToolRunEnv {
                ctx: self.ctx.clone(),
                agent: Arc::clone(agent),
                hooks: self.hooks.clone(),
                tracer: self.tracer,
                turn: self.turn,
                cancellation: self.config.cancellation.clone(),
            };
            execute_tools(&env, processed.functions, processed.computer_actions).await?
        } else {
            ExecutedTools::default()
        };
        self.push_items(executed.items(&call_order));

        if !processed.handoffs.is_empty() {
            let outcome = execute_handoffs(
                &self.ctx,
                agent,
                &self.hooks,
                self.tracer,
                processed.handoffs,
                self.config.handoff_input_filter.as_ref(),
                &self.config.cancellation,
            )
            .await?;
            self.push_items(outcome.items);
            if let Some(filter) = outcome.input_filter {
                self.apply_handoff_filter(&filter, turn_start);
            }
            return Ok(NextStep::Handoff(outcome.new_agent));
        }

        if tools_end_run {
            if let Some(ending) = executed.functions.iter().find(|r| r.ends_run) {
                debug!(agent = agent.name(), tool_name = %ending.tool_name, "tool ended the run");
                return Ok(NextStep::FinalOutput(ending.output.clone()));
            }
        }
        let behavior = self.config.tool_use_behavior_for(agent);
        if let Some(output) = final_output_from_tools(behavior, &self.ctx, &executed.functions).await? {
            debug!(agent = agent.name(), turn = self.turn, "tool output is the final output");
            return Ok(NextStep::FinalOutput(output));
        }
        if has_tools {
            return Ok(NextStep::RunAgain);
        }

        match message_text {
            Some(text) => agent.output_type().parse_final(&text).map(NextStep::FinalOutput),
            None => Err(RunError::model_behavior(
                "model produced neither a final output nor any tool calls",
            )),
        }
    }

    async fn run_input_guardrails(&mut self, agent: &Agent) -> Result<(), RunError> {
        let guardrails: Vec<Arc<dyn InputGuardrail>> = agent
            .input_guardrails()
            .iter()
            .chain(&self.config.input_guardrails)
            .cloned()
            .collect();
        if guardrails.is_empty() {
            return Ok(());
        }
        let input = self.input.to_items();
        let check = async {
            self.guardrails
                .run_input(&guardrails, &self.ctx, agent.name(), &input)
                .await
                .map_err(|e| RunError::from_guardrail(GuardrailStage::Input, e))
        };
        self.input_guardrail_results = cancellable(&self.config.cancellation, check).await?;
        Ok(())
    }

    async fn assemble_tools(&self, agent: &Agent) -> Result<ToolRegistry, RunError> {
        let setup_error = |e: ToolError| {
            if e.is_configuration() {
                RunError::user(e.to_string())
            } else {
                RunError::ToolSetup {
                    turn: self.turn,
                    agent: agent.name().to_owned(),
                    source: e,
                }
            }
        };
        let server_tools = collect_mcp_tools(agent.mcp_servers(), self.tracer.enabled())
            .await
            .map_err(&setup_error)?;
        ToolRegistry::assemble(agent.tools(), server_tools).map_err(&setup_error)
    }

    fn model_input(&self) -> Vec<InputItem> {
        self.history
            .iter()
            .cloned()
            .chain(self.model_items.iter().map(RunItem::to_input_item))
            .collect()
    }

    fn model_settings(&self, agent: &Agent) -> ModelSettings {
        let mut settings = agent.model_settings().resolve(self.config.model_settings.as_ref());
        if let Some(parallel) = self.config.parallel_tool_calls {
            settings.parallel_tool_calls = Some(parallel);
        }
        if self.config.reset_tool_choice_for(agent) && self.tracker.has_used_tools(agent.name()) {
            settings.tool_choice = None;
        }
        settings
    }

    fn model_tracing(&self) -> ModelTracing {
        if !self.tracer.enabled() {
            ModelTracing::Disabled
        } else if self.tracer.records_data() {
            ModelTracing::Enabled
        } else {
            ModelTracing::EnabledWithoutData
        }
    }

    async fn call_model(&self, agent: &Agent, model: &dyn Model, request: &ModelRequest) -> Result<ModelResponse, RunError> {
        let span = self.tracer.generation(agent.name(), model.name(), self.turn);
        let cancellation = &self.config.cancellation;
        let outcome = async {
            tokio::select! {
                biased;
                () = cancellation.cancelled() => Err(ModelError::Cancelled),
                result = async {
                    match &self.sink {
                        Some(sink) => stream_model(model, request, sink).await,
                        None => model.get_response(request).await,
                    }
                } => result,
            }
        }
        .instrument(span.clone())
        .await;

        let response = outcome.map_err(|e| RunError::from_model(self.turn, agent.name(), e))?;
        let _ = span.record("input_tokens", response.usage.input_tokens);
        let _ = span.record("output_tokens", response.usage.output_tokens);
        debug!(
            model = model.name(),
            items = response.output.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "model responded"
        );
        Ok(response)
    }

    fn record_usage(&mut self, agent_name: &str, usage: &Usage) {
        self.ctx.add_usage(usage);
        self.usage.add(usage);
        self.usage_by_agent.entry(agent_name.to_owned()).or_default().add(usage);
    }

    fn push_items(&mut self, items: Vec<RunItem>) {
        if items.is_empty() {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.items(&items);
        }
        self.model_items.extend(items.iter().cloned());
        self.new_items.extend(items);
    }

    /// Rewrite what the next agent sees. `new_items` is left untouched.
    fn apply_handoff_filter(&mut self, filter: &HandoffInputFilter, turn_start: usize) {
        let mut pre_handoff_items = mem::take(&mut self.model_items);
        let new_items = pre_handoff_items.split_off(turn_start.min(pre_handoff_items.len()));
        let filtered = filter(HandoffInputData {
            input_history: mem::take(&mut self.history),
            pre_handoff_items,
            new_items,
        });
        debug!(
            history = filtered.input_history.len(),
            items = filtered.pre_handoff_items.len() + filtered.new_items.len(),
            "handoff input filtered"
        );
        self.history = filtered.input_history;
        self.model_items = filtered.pre_handoff_items;
        self.model_items.extend(filtered.new_items);
    }

    async fn finish(&mut self, agent: &Arc<Agent>, output: Value) -> Result<RunResult, RunError> {
        let guardrails: Vec<Arc<dyn OutputGuardrail>> = agent
            .output_guardrails()
            .iter()
            .chain(&self.config.output_guardrails)
            .cloned()
            .collect();
        let output_guardrail_results = if guardrails.is_empty() {
            Vec::new()
        } else {
            let check = async {
                self.guardrails
                    .run_output(&guardrails, &self.ctx, agent.name(), &output)
                    .await
                    .map_err(|e| RunError::from_guardrail(GuardrailStage::Output, e))
            };
            cancellable(&self.config.cancellation, check).await?
        };

        self.hooks
            .emit(
                &self.ctx,
                agent.hooks(),
                &HookEvent::AgentEnd {
                    agent: agent.name().to_owned(),
                    output: output.clone(),
                },
            )
            .await?;

        Ok(RunResult {
            input: self.input.clone(),
            new_items: mem::take(&mut self.new_items),
            raw_responses: mem::take(&mut self.raw_responses),
            final_output: output,
            last_agent: Arc::clone(agent),
            input_guardrail_results: mem::take(&mut self.input_guardrail_results),
            output_guardrail_results,
            usage: self.usage,
            usage_by_agent: mem::take(&mut self.usage_by_agent),
            turns: self.turn,
        })
    }
}

async fn cancellable<T>(
    token: &CancellationToken,
    fut: impl Future<Output = Result<T, RunError>>,
) -> Result<T, RunError> {
    tokio::select! {
        biased;
        () = token.cancelled() => Err(RunError::Cancelled),
        result = fut => result,
    }
}

/// Forward a streamed call's raw events and return its aggregate response.
async fn stream_model(model: &dyn Model, request: &ModelRequest, sink: &EventSink) -> ModelResult<ModelResponse> {
    let mut events = model.stream_response(request).await?;
    let mut completed = None;
    while let Some(event) = events.next().await {
        match event? {
            ModelStreamEvent::Raw(raw) => sink.raw(raw),
            ModelStreamEvent::Completed(response) => completed = Some(response),
        }
    }
    completed.ok_or_else(|| ModelError::Stream {
        message: "stream ended without a completed response".to_owned(),
    })
}
