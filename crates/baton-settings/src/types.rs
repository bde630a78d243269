//! Settings type definitions.
//!
//! Field names are camelCase on disk. Every section is `#[serde(default)]`,
//! so a settings file only needs the keys it changes.

use serde::{Deserialize, Serialize};

/// Root settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatonSettings {
    /// Run loop limits and tracing switches.
    pub runner: RunnerSettings,
    /// Model selection.
    pub model: ModelSelectionSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Run loop settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunnerSettings {
    /// Model calls allowed per run.
    pub max_turns: u32,
    /// Disable span emission for every run.
    pub tracing_disabled: bool,
    /// Record inputs and outputs on spans.
    pub trace_include_sensitive_data: bool,
    /// Name of the top-level workflow span.
    pub workflow_name: String,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_turns: 10,
            tracing_disabled: false,
            trace_include_sensitive_data: true,
            workflow_name: "Agent workflow".to_string(),
        }
    }
}

/// Model selection settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSelectionSettings {
    /// Model used when neither the agent nor the run names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
