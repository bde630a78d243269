//! Concurrent guardrail evaluation.
//!
//! All guardrails of one class start together. Results are consumed in
//! completion order: the first tripwire or failure ends evaluation and drops
//! the guardrails still in flight. When every guardrail passes, results are
//! returned in declaration order.

use std::sync::Arc;

use baton_core::{InputItem, RunContext};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::Value;
use tracing::{Instrument, Span, debug, info_span, warn};

use crate::errors::{GuardrailError, GuardrailTripwire};
use crate::guardrail::{GuardrailFunctionOutput, GuardrailResult, InputGuardrail, OutputGuardrail};

/// Runs guardrail classes for a run.
#[derive(Clone, Copy, Debug)]
pub struct GuardrailEngine {
    tracing_enabled: bool,
}

impl Default for GuardrailEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl GuardrailEngine {
    /// Engine that opens a `guardrail` span per check when `tracing_enabled`.
    pub fn new(tracing_enabled: bool) -> Self {
        Self { tracing_enabled }
    }

    fn span(&self, name: &str, kind: &'static str) -> Span {
        if self.tracing_enabled {
            info_span!("guardrail", guardrail = name, kind)
        } else {
            Span::none()
        }
    }

    /// Run input guardrails against the starting agent's input.
    pub async fn run_input(
        &self,
        guardrails: &[Arc<dyn InputGuardrail>],
        ctx: &RunContext,
        agent_name: &str,
        input: &[InputItem],
    ) -> Result<Vec<GuardrailResult>, GuardrailError> {
        let pending: FuturesUnordered<_> = guardrails
            .iter()
            .enumerate()
            .map(|(index, guardrail)| {
                let span = self.span(guardrail.name(), "input");
                async move {
                    let outcome = guardrail.check(ctx, agent_name, input).await;
                    (index, guardrail.name().to_owned(), outcome)
                }
                .instrument(span)
            })
            .collect();
        collect(pending, agent_name).await
    }

    /// Run output guardrails against the final output.
    pub async fn run_output(
        &self,
        guardrails: &[Arc<dyn OutputGuardrail>],
        ctx: &RunContext,
        agent_name: &str,
        output: &Value,
    ) -> Result<Vec<GuardrailResult>, GuardrailError> {
        let pending: FuturesUnordered<_> = guardrails
            .iter()
            .enumerate()
            .map(|(index, guardrail)| {
                let span = self.span(guardrail.name(), "output");
                async move {
                    let outcome = guardrail.check(ctx, agent_name, output).await;
                    (index, guardrail.name().to_owned(), outcome)
                }
                .instrument(span)
            })
            .collect();
        collect(pending, agent_name).await
    }
}

async fn collect<S>(mut pending: S, agent_name: &str) -> Result<Vec<GuardrailResult>, GuardrailError>
where
    S: futures::Stream<Item = (usize, String, Result<GuardrailFunctionOutput, GuardrailError>)> + Unpin,
{
    let mut passed = Vec::new();
    while let Some((index, name, outcome)) = pending.next().await {
        let output = outcome?;
        if output.tripwire_triggered {
            warn!(guardrail = %name, agent = agent_name, "guardrail tripwire triggered");
            return Err(GuardrailError::Tripwire(GuardrailTripwire {
                guardrail_name: name,
                agent_name: agent_name.to_owned(),
                output_info: output.output_info,
            }));
        }
        debug!(guardrail = %name, agent = agent_name, "guardrail passed");
        passed.push((
            index,
            GuardrailResult {
                guardrail_name: name,
                agent_name: agent_name.to_owned(),
                output,
            },
        ));
    }
    passed.sort_by_key(|(index, _)| *index);
    Ok(passed.into_iter().map(|(_, result)| result).collect())
}
