//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`BatonSettings::default()`]
//! 2. If `~/.baton/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `BATON_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::BatonSettings;

/// Upper bound accepted for `BATON_MAX_TURNS`.
pub const MAX_TURNS_LIMIT: u32 = 1000;

/// Resolve the path to the settings file (`~/.baton/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".baton").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<BatonSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or a zero `maxTurns` is an
/// error.
pub fn load_settings_from_path(path: &Path) -> Result<BatonSettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn load_file(path: &Path) -> Result<BatonSettings> {
    let defaults = serde_json::to_value(BatonSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let settings: BatonSettings = serde_json::from_value(merged)?;
    if settings.runner.max_turns == 0 {
        return Err(SettingsError::InvalidValue(
            "runner.maxTurns must be at least 1".into(),
        ));
    }
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `BATON_*` environment overrides to loaded settings.
///
/// Invalid values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut BatonSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup` instead of the process environment.
pub fn apply_overrides_from<F>(settings: &mut BatonSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Runner ──────────────────────────────────────────────────────
    if let Some(v) = env.u32_in("BATON_MAX_TURNS", 1, MAX_TURNS_LIMIT) {
        settings.runner.max_turns = v;
    }
    if let Some(v) = env.bool("BATON_TRACING_DISABLED") {
        settings.runner.tracing_disabled = v;
    }
    if let Some(v) = env.bool("BATON_TRACE_SENSITIVE") {
        settings.runner.trace_include_sensitive_data = v;
    }
    if let Some(v) = env.string("BATON_WORKFLOW_NAME") {
        settings.runner.workflow_name = v;
    }

    // ── Model and logging ───────────────────────────────────────────
    if let Some(v) = env.string("BATON_DEFAULT_MODEL") {
        settings.model.default_model = Some(v);
    }
    if let Some(v) = env.string("BATON_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u32_in(&self, name: &str, min: u32, max: u32) -> Option<u32> {
        let val = (self.lookup)(name)?;
        let result = parse_u32_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, min, max, "invalid integer env var, ignoring");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"runner": {"maxTurns": 10, "workflowName": "w"}});
        let source = serde_json::json!({"runner": {"maxTurns": 4}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["runner"]["maxTurns"], 4);
        assert_eq!(merged["runner"]["workflowName"], "w");
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(
            serde_json::json!({"a": 1, "b": 2}),
            serde_json::json!({"a": null}),
        );
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_replace() {
        let merged = deep_merge(
            serde_json::json!({"items": [1, 2, 3]}),
            serde_json::json!({"items": [4]}),
        );
        assert_eq!(merged["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let merged = deep_merge(
            serde_json::json!({"a": {"nested": true}}),
            serde_json::json!({"a": 42}),
        );
        assert_eq!(merged["a"], 42);
    }

    // ── loading ─────────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_file(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings, BatonSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"runner": {"maxTurns": 25, "tracingDisabled": true}, "model": {"defaultModel": "gpt-4.1"}}"#,
        )
        .unwrap();

        let settings = load_file(&path).unwrap();
        assert_eq!(settings.runner.max_turns, 25);
        assert!(settings.runner.tracing_disabled);
        assert_eq!(settings.runner.workflow_name, "Agent workflow");
        assert_eq!(settings.model.default_model.as_deref(), Some("gpt-4.1"));
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert!(matches!(load_file(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn zero_max_turns_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"runner": {"maxTurns": 0}}"#).unwrap();
        assert!(matches!(
            load_file(&path),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = BatonSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("BATON_MAX_TURNS", "3"),
                ("BATON_TRACING_DISABLED", "yes"),
                ("BATON_TRACE_SENSITIVE", "off"),
                ("BATON_WORKFLOW_NAME", "Support flow"),
                ("BATON_DEFAULT_MODEL", "gpt-4o-mini"),
                ("BATON_LOG_LEVEL", "debug"),
            ]),
        );
        assert_eq!(settings.runner.max_turns, 3);
        assert!(settings.runner.tracing_disabled);
        assert!(!settings.runner.trace_include_sensitive_data);
        assert_eq!(settings.runner.workflow_name, "Support flow");
        assert_eq!(settings.model.default_model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = BatonSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("BATON_MAX_TURNS", "0"),
                ("BATON_TRACING_DISABLED", "maybe"),
                ("BATON_WORKFLOW_NAME", ""),
            ]),
        );
        assert_eq!(settings, BatonSettings::default());
    }

    #[test]
    fn max_turns_upper_bound() {
        assert_eq!(parse_u32_range("1000", 1, MAX_TURNS_LIMIT), Some(1000));
        assert_eq!(parse_u32_range("1001", 1, MAX_TURNS_LIMIT), None);
        assert_eq!(parse_u32_range("ten", 1, MAX_TURNS_LIMIT), None);
    }

    #[test]
    fn parse_bool_variants() {
        for val in ["true", "1", "YES", "On"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in ["false", "0", "no", "OFF"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("2"), None);
    }
}
