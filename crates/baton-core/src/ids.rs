//! Identifier generation.
//!
//! Item and call ids are time-ordered UUID v7 values with a short kind
//! prefix, e.g. `msg_0190...`.

use uuid::Uuid;

/// Generate a prefixed, time-ordered identifier.
pub fn generate_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::now_v7().simple())
}

/// Identifier for an output message item.
pub fn message_id() -> String {
    generate_id("msg")
}

/// Identifier for a tool or handoff call.
pub fn call_id() -> String {
    generate_id("call")
}

/// Identifier for a run trace.
pub fn trace_id() -> String {
    generate_id("trace")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix() {
        assert!(message_id().starts_with("msg_"));
        assert!(call_id().starts_with("call_"));
        assert!(trace_id().starts_with("trace_"));
    }

    #[test]
    fn ids_are_unique() {
        let a = generate_id("x");
        let b = generate_id("x");
        assert_ne!(a, b);
    }
}
