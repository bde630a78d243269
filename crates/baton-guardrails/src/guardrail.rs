//! Guardrail traits and closure-backed implementations.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use baton_core::{InputItem, RunContext};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::GuardrailError;

/// What a guardrail function returns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardrailFunctionOutput {
    /// Whether the run must stop.
    pub tripwire_triggered: bool,
    /// Diagnostic payload.
    pub output_info: Value,
}

impl GuardrailFunctionOutput {
    /// A passing result.
    pub fn pass(output_info: Value) -> Self {
        Self {
            tripwire_triggered: false,
            output_info,
        }
    }

    /// A tripping result.
    pub fn trip(output_info: Value) -> Self {
        Self {
            tripwire_triggered: true,
            output_info,
        }
    }
}

/// A guardrail that passed, as recorded on the run result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuardrailResult {
    /// Guardrail name.
    pub guardrail_name: String,
    /// Agent it ran for.
    pub agent_name: String,
    /// Function output.
    pub output: GuardrailFunctionOutput,
}

/// Check over the run input.
#[async_trait]
pub trait InputGuardrail: Send + Sync {
    /// Guardrail name.
    fn name(&self) -> &str;

    /// Evaluate the input the starting agent received.
    async fn check(
        &self,
        ctx: &RunContext,
        agent_name: &str,
        input: &[InputItem],
    ) -> Result<GuardrailFunctionOutput, GuardrailError>;
}

/// Check over the final output.
#[async_trait]
pub trait OutputGuardrail: Send + Sync {
    /// Guardrail name.
    fn name(&self) -> &str;

    /// Evaluate the final output of the last agent.
    async fn check(
        &self,
        ctx: &RunContext,
        agent_name: &str,
        output: &Value,
    ) -> Result<GuardrailFunctionOutput, GuardrailError>;
}

type InputFn = Arc<
    dyn Fn(RunContext, String, Vec<InputItem>) -> BoxFuture<'static, Result<GuardrailFunctionOutput, GuardrailError>>
        + Send
        + Sync,
>;

type OutputFn = Arc<
    dyn Fn(RunContext, String, Value) -> BoxFuture<'static, Result<GuardrailFunctionOutput, GuardrailError>>
        + Send
        + Sync,
>;

/// Input guardrail backed by a closure.
#[derive(Clone)]
pub struct FnInputGuardrail {
    name: String,
    f: InputFn,
}

impl FnInputGuardrail {
    /// Wrap `f` under `name`.
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(RunContext, String, Vec<InputItem>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GuardrailFunctionOutput, GuardrailError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(move |ctx, agent, input| Box::pin(f(ctx, agent, input))),
        }
    }
}

impl fmt::Debug for FnInputGuardrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnInputGuardrail").field(&self.name).finish()
    }
}

#[async_trait]
impl InputGuardrail for FnInputGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(
        &self,
        ctx: &RunContext,
        agent_name: &str,
        input: &[InputItem],
    ) -> Result<GuardrailFunctionOutput, GuardrailError> {
        (self.f)(ctx.clone(), agent_name.to_owned(), input.to_vec()).await
    }
}

/// Output guardrail backed by a closure.
#[derive(Clone)]
pub struct FnOutputGuardrail {
    name: String,
    f: OutputFn,
}

impl FnOutputGuardrail {
    /// Wrap `f` under `name`.
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(RunContext, String, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<GuardrailFunctionOutput, GuardrailError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(move |ctx, agent, output| Box::pin(f(ctx, agent, output))),
        }
    }
}

impl fmt::Debug for FnOutputGuardrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnOutputGuardrail").field(&self.name).finish()
    }
}

#[async_trait]
impl OutputGuardrail for FnOutputGuardrail {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(
        &self,
        ctx: &RunContext,
        agent_name: &str,
        output: &Value,
    ) -> Result<GuardrailFunctionOutput, GuardrailError> {
        (self.f)(ctx.clone(), agent_name.to_owned(), output.clone()).await
    }
}
