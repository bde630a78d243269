//! Caller context threaded through hooks, guardrails and tools.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::usage::Usage;

/// Opaque caller value plus the run's live usage counters.
///
/// The runtime never inspects the value. Clones share both the value and the
/// usage counters, so tools running concurrently observe the same totals.
/// Callers whose tools mutate the value must make it concurrency-safe
/// themselves (e.g. wrap it in a mutex).
#[derive(Clone)]
pub struct RunContext {
    value: Arc<dyn Any + Send + Sync>,
    usage: Arc<Mutex<Usage>>,
}

impl RunContext {
    /// Wrap a caller value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            usage: Arc::new(Mutex::new(Usage::default())),
        }
    }

    /// A context without a caller value.
    pub fn empty() -> Self {
        Self::new(())
    }

    /// Borrow the caller value as `T`, if it is one.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Usage accumulated so far in this run.
    pub fn usage(&self) -> Usage {
        *self.usage.lock()
    }

    /// Record usage of one model call.
    pub fn add_usage(&self, usage: &Usage) {
        self.usage.lock().add(usage);
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("usage", &self.usage())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Session {
        user: &'static str,
    }

    #[test]
    fn get_downcasts_value() {
        let ctx = RunContext::new(Session { user: "ada" });
        assert_eq!(ctx.get::<Session>(), Some(&Session { user: "ada" }));
        assert!(ctx.get::<String>().is_none());
    }

    #[test]
    fn clones_share_usage() {
        let ctx = RunContext::empty();
        let clone = ctx.clone();
        clone.add_usage(&Usage::single(3, 4));
        assert_eq!(ctx.usage().total_tokens, 7);
    }

    #[test]
    fn debug_does_not_require_value_debug() {
        struct Opaque;
        let ctx = RunContext::new(Opaque);
        assert!(format!("{ctx:?}").contains("RunContext"));
    }
}
