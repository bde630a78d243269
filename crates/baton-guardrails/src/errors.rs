//! Guardrail error types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Which guardrail fired and what it reported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GuardrailTripwire {
    /// Guardrail name.
    pub guardrail_name: String,
    /// Agent the guardrail ran for.
    pub agent_name: String,
    /// Diagnostic payload from the guardrail.
    pub output_info: Value,
}

/// Why a guardrail class did not pass.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// A guardrail's tripwire fired.
    #[error("Guardrail {} triggered tripwire", .0.guardrail_name)]
    Tripwire(GuardrailTripwire),

    /// A guardrail failed to evaluate.
    #[error("Guardrail {name} failed: {message}")]
    Failed {
        /// Guardrail name.
        name: String,
        /// Failure description.
        message: String,
    },
}

impl GuardrailError {
    /// Build an evaluation failure.
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether this is a tripwire rather than a failure.
    pub fn is_tripwire(&self) -> bool {
        matches!(self, Self::Tripwire(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tripwire_display_names_guardrail() {
        let err = GuardrailError::Tripwire(GuardrailTripwire {
            guardrail_name: "no_pii".into(),
            agent_name: "a".into(),
            output_info: Value::Null,
        });
        assert_eq!(err.to_string(), "Guardrail no_pii triggered tripwire");
        assert!(err.is_tripwire());
    }

    #[test]
    fn tripwire_serializes_its_diagnostics() {
        let tripwire = GuardrailTripwire {
            guardrail_name: "math_homework".into(),
            agent_name: "tutor".into(),
            output_info: serde_json::json!({"reason": "homework", "confidence": 0.9}),
        };
        insta::assert_json_snapshot!(tripwire, @r#"
        {
          "guardrail_name": "math_homework",
          "agent_name": "tutor",
          "output_info": {
            "confidence": 0.9,
            "reason": "homework"
          }
        }
        "#);
    }

    #[test]
    fn failure_is_not_tripwire() {
        let err = GuardrailError::failed("classifier", "timeout");
        assert!(!err.is_tripwire());
        assert_eq!(err.to_string(), "Guardrail classifier failed: timeout");
    }
}
