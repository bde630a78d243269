//! Hook handler trait.

use async_trait::async_trait;
use baton_core::RunContext;

use crate::errors::HookError;
use crate::types::HookEvent;

/// Observer of run lifecycle events.
///
/// The same trait serves both scopes: pass an implementation to the run
/// configuration to see every agent, or to an agent to see only its events.
/// Returning an error aborts the run.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Handler name, for error reporting.
    fn name(&self) -> &str {
        "hooks"
    }

    /// Handle one event.
    async fn on_event(&self, ctx: &RunContext, event: &HookEvent) -> Result<(), HookError>;
}
