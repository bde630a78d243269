//! Logging bootstrap on top of `tracing`.
//!
//! Library code only emits `tracing` events and spans; binaries and tests pick
//! a subscriber here. `RUST_LOG` always wins over the level passed in.

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, CapturedSpan, capture_logs};

use tracing_subscriber::EnvFilter;

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a compact human-readable subscriber writing to stderr.
///
/// Subsequent calls are no-ops.
pub fn init_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}

/// Install a JSON subscriber writing one object per line to stderr.
///
/// Span fields (agent, turn, tool) are flattened into each event.
pub fn init_json_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .json()
        .with_current_span(true)
        .with_span_list(false);

    let _ = subscriber.try_init();
}
