//! Layered settings loading: defaults → user file → environment.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::AttuneSettings;

/// Location of the user settings file: `~/.attune/settings.json`.
#[must_use]
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".attune").join("settings.json")
}

/// Recursively merge `overlay` onto `base`.
///
/// Objects merge key-by-key; any other overlay value replaces the base
/// value wholesale.
#[must_use]
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from the default path.
///
/// A missing file is not an error: defaults plus environment overrides
/// apply. A present-but-broken file is an error so the caller can decide
/// whether to fall back.
pub fn load_settings() -> Result<AttuneSettings> {
    let path = settings_path();
    if !path.exists() {
        debug!(?path, "no settings file, using defaults");
        let mut settings = AttuneSettings::default();
        apply_env_overrides(&mut settings);
        settings.validate();
        return Ok(settings);
    }
    load_settings_from_path(&path)
}

/// Load settings from an explicit file path, deep-merged over defaults,
/// with environment overrides applied last.
pub fn load_settings_from_path(path: &Path) -> Result<AttuneSettings> {
    let defaults = serde_json::to_value(AttuneSettings::default())?;
    let raw = std::fs::read_to_string(path)?;
    let file: Value = serde_json::from_str(&raw)?;
    let merged = deep_merge(defaults, file);
    let mut settings: AttuneSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate();
    debug!(?path, "settings loaded");
    Ok(settings)
}

/// Apply `ATTUNE_*` environment overrides, the highest-priority layer.
pub fn apply_env_overrides(settings: &mut AttuneSettings) {
    apply_overrides_from(settings, |key| std::env::var(key).ok());
}

fn apply_overrides_from(
    settings: &mut AttuneSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(url) = lookup("ATTUNE_CHAT_URL")
        && !url.is_empty()
    {
        settings.completion.base_url = url;
    }
    if let Some(raw) = lookup("ATTUNE_CHAT_TIMEOUT_MS") {
        match raw.parse::<u64>() {
            Ok(ms) if ms > 0 => settings.completion.timeout_ms = ms,
            _ => warn!(raw = %raw, "ignoring invalid ATTUNE_CHAT_TIMEOUT_MS"),
        }
    }
    if let Some(level) = lookup("ATTUNE_LOG")
        && !level.is_empty()
    {
        settings.logging.level = level;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn deep_merge_combines_disjoint_keys() {
        let merged = deep_merge(json!({"x": 1}), json!({"y": 2}));
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }

    #[test]
    fn deep_merge_overlay_wins_on_conflict() {
        let merged = deep_merge(json!({"x": 1}), json!({"x": 9}));
        assert_eq!(merged["x"], 9);
    }

    #[test]
    fn deep_merge_recurses_into_objects() {
        let base = json!({"affect": {"windowSize": 5, "minSamples": 3}});
        let overlay = json!({"affect": {"windowSize": 8}});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["affect"]["windowSize"], 8);
        assert_eq!(merged["affect"]["minSamples"], 3);
    }

    #[test]
    fn deep_merge_replaces_non_objects_wholesale() {
        let merged = deep_merge(json!({"list": [1, 2, 3]}), json!({"list": [9]}));
        assert_eq!(merged["list"], json!([9]));
    }

    #[test]
    fn load_from_path_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"affect": {"windowSize": 7}}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.affect.window_size, 7);
        // Everything else stays default
        assert_eq!(settings.affect.min_samples, 3);
        assert_eq!(settings.completion.timeout_ms, 15_000);
    }

    #[test]
    fn load_from_path_validates_merged_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"affect": {"confidenceFloor": 4.0}}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert!((settings.affect.confidence_floor - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn load_from_missing_path_is_an_error() {
        let result = load_settings_from_path(Path::new("/nonexistent/settings.json"));
        assert!(result.is_err());
    }

    #[test]
    fn load_from_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_settings_from_path(&path).is_err());
    }

    #[test]
    fn settings_path_is_under_the_home_directory() {
        let path = settings_path();
        assert!(path.ends_with(".attune/settings.json"));
    }

    // ── environment overrides ──────────────────────────────────────

    #[test]
    fn env_overrides_chat_url() {
        let mut settings = AttuneSettings::default();
        apply_overrides_from(
            &mut settings,
            lookup_from(&[("ATTUNE_CHAT_URL", "http://10.0.0.7:9000")]),
        );
        assert_eq!(settings.completion.base_url, "http://10.0.0.7:9000");
    }

    #[test]
    fn env_overrides_timeout_when_valid() {
        let mut settings = AttuneSettings::default();
        apply_overrides_from(
            &mut settings,
            lookup_from(&[("ATTUNE_CHAT_TIMEOUT_MS", "30000")]),
        );
        assert_eq!(settings.completion.timeout_ms, 30_000);
    }

    #[test]
    fn env_ignores_unparseable_or_zero_timeout() {
        let mut settings = AttuneSettings::default();
        apply_overrides_from(
            &mut settings,
            lookup_from(&[("ATTUNE_CHAT_TIMEOUT_MS", "soon")]),
        );
        assert_eq!(settings.completion.timeout_ms, 15_000);

        apply_overrides_from(
            &mut settings,
            lookup_from(&[("ATTUNE_CHAT_TIMEOUT_MS", "0")]),
        );
        assert_eq!(settings.completion.timeout_ms, 15_000);
    }

    #[test]
    fn env_overrides_log_level() {
        let mut settings = AttuneSettings::default();
        apply_overrides_from(&mut settings, lookup_from(&[("ATTUNE_LOG", "debug")]));
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut settings = AttuneSettings::default();
        apply_overrides_from(
            &mut settings,
            lookup_from(&[("ATTUNE_CHAT_URL", ""), ("ATTUNE_LOG", "")]),
        );
        assert_eq!(settings.completion.base_url, "http://127.0.0.1:8080");
        assert_eq!(settings.logging.level, "info");
    }
}
