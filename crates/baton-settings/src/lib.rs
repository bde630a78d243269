//! # baton-settings
//!
//! Runner configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`BatonSettings::default()`]
//! 2. **User file**: `~/.baton/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `BATON_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::{BatonSettings, LoggingSettings, ModelSelectionSettings, RunnerSettings};

use std::sync::OnceLock;

static SETTINGS: OnceLock<BatonSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// The first call loads `~/.baton/settings.json` with env overrides and falls
/// back to compiled defaults (with a warning) if loading fails.
pub fn get_settings() -> &'static BatonSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|error| {
            tracing::warn!(%error, "failed to load settings, using defaults");
            BatonSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: BatonSettings) -> std::result::Result<(), BatonSettings> {
    SETTINGS.set(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_then_get_returns_preset() {
        let mut preset = BatonSettings::default();
        preset.runner.workflow_name = "preset".into();
        let first = init_settings(preset.clone());
        // Only test in this crate that touches the global.
        assert!(first.is_ok());
        assert_eq!(get_settings(), &preset);
        assert!(init_settings(BatonSettings::default()).is_err());
    }
}
