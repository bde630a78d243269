//! Per-call model tuning.

use serde::{Deserialize, Serialize};

/// How the model may choose tools.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides.
    Auto,
    /// The model must call some tool.
    Required,
    /// The model must not call tools.
    None,
    /// The model must call the named tool.
    Named(String),
}

/// Context truncation strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Truncation {
    /// Drop the oldest input when the context overflows.
    Auto,
    /// Fail when the context overflows.
    Disabled,
}

/// Optional tuning knobs; `None` leaves the provider default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Output token cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tool choice constraint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Whether the model may emit several tool calls per turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    /// Truncation strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation: Option<Truncation>,
}

impl ModelSettings {
    /// Overlay `overrides` onto `self`, field by field.
    #[must_use]
    pub fn resolve(&self, overrides: Option<&ModelSettings>) -> ModelSettings {
        let Some(o) = overrides else {
            return self.clone();
        };
        ModelSettings {
            temperature: o.temperature.or(self.temperature),
            top_p: o.top_p.or(self.top_p),
            max_tokens: o.max_tokens.or(self.max_tokens),
            tool_choice: o.tool_choice.clone().or_else(|| self.tool_choice.clone()),
            parallel_tool_calls: o.parallel_tool_calls.or(self.parallel_tool_calls),
            truncation: o.truncation.or(self.truncation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_without_overrides_is_identity() {
        let base = ModelSettings {
            temperature: Some(0.2),
            ..Default::default()
        };
        assert_eq!(base.resolve(None), base);
    }

    #[test]
    fn resolve_overlays_set_fields_only() {
        let base = ModelSettings {
            temperature: Some(0.2),
            max_tokens: Some(100),
            tool_choice: Some(ToolChoice::Required),
            ..Default::default()
        };
        let over = ModelSettings {
            temperature: Some(0.9),
            parallel_tool_calls: Some(false),
            ..Default::default()
        };
        let merged = base.resolve(Some(&over));
        assert_eq!(merged.temperature, Some(0.9));
        assert_eq!(merged.max_tokens, Some(100));
        assert_eq!(merged.tool_choice, Some(ToolChoice::Required));
        assert_eq!(merged.parallel_tool_calls, Some(false));
    }

    #[test]
    fn unset_fields_are_not_serialized() {
        let json = serde_json::to_value(ModelSettings::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
