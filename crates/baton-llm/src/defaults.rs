//! Process-scoped provider defaults.
//!
//! Providers read these when a model is constructed without explicit
//! credentials. The run loop never does: it receives a resolved [`Model`].
//!
//! [`Model`]: crate::Model

use std::sync::LazyLock;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Model used when neither the agent nor the run names one.
pub const FALLBACK_MODEL: &str = "gpt-4o";

/// Defaults shared by every provider in the process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDefaults {
    /// API key used when a provider is built without one.
    pub api_key: Option<String>,
    /// Endpoint override.
    pub base_url: Option<String>,
    /// Model name used when none is requested.
    pub default_model: String,
}

impl Default for ProviderDefaults {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            default_model: FALLBACK_MODEL.to_owned(),
        }
    }
}

static DEFAULTS: LazyLock<RwLock<ProviderDefaults>> =
    LazyLock::new(|| RwLock::new(ProviderDefaults::default()));

/// Snapshot of the current defaults.
pub fn provider_defaults() -> ProviderDefaults {
    DEFAULTS.read().clone()
}

/// Set the default API key.
pub fn set_default_api_key(key: impl Into<String>) {
    DEFAULTS.write().api_key = Some(key.into());
    debug!("default provider api key set");
}

/// Set the default endpoint.
pub fn set_default_base_url(url: impl Into<String>) {
    let url = url.into();
    debug!(base_url = %url, "default provider base url set");
    DEFAULTS.write().base_url = Some(url);
}

/// Set the model used when none is requested.
pub fn set_default_model(model: impl Into<String>) {
    let model = model.into();
    debug!(model = %model, "default model set");
    DEFAULTS.write().default_model = model;
}

/// Restore compiled defaults. Intended for tests.
pub fn reset_provider_defaults() {
    *DEFAULTS.write() = ProviderDefaults::default();
}
