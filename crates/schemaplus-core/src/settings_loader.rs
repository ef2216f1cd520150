//! Settings loading from configuration files.
//!
//! This module provides functions to load [`Settings`] from TOML and JSON
//! files, and to apply environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `SCHEMAPLUS_DEBUG` | `debug` |
//! | `SCHEMAPLUS_LOG_LEVEL` | `log_level` |
//! | `SCHEMAPLUS_AUTO_CREATE` | `foreign_keys.auto_create` |
//! | `SCHEMAPLUS_AUTO_INDEX` | `foreign_keys.auto_index` |
//! | `SCHEMAPLUS_ON_UPDATE` | `foreign_keys.on_update` |
//! | `SCHEMAPLUS_ON_DELETE` | `foreign_keys.on_delete` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use schemaplus_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file("config/schemaplus.toml").unwrap();
//! let settings = settings_loader::from_toml_file_with_env("config/schemaplus.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::SchemaPlusError;
use crate::settings::{ReferenceAction, Settings};

/// Loads settings from a TOML string.
///
/// Any keys not present in the TOML keep their default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, SchemaPlusError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| SchemaPlusError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, SchemaPlusError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        SchemaPlusError::ConfigurationError(format!(
            "Failed to read TOML file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the TOML is malformed, or
/// an environment variable holds an unknown referential action.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, SchemaPlusError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, SchemaPlusError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| SchemaPlusError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, SchemaPlusError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        SchemaPlusError::ConfigurationError(format!(
            "Failed to read JSON file '{}': {e}",
            path.as_ref().display()
        ))
    })?;
    from_json_str(&content)
}

/// Loads settings from just environment variables (starting from defaults).
///
/// # Errors
///
/// Returns an error if an environment variable holds an unknown referential action.
pub fn from_env() -> Result<Settings, SchemaPlusError> {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings)?;
    Ok(settings)
}

/// Applies environment variable overrides to a settings struct.
///
/// Boolean variables accept "true"/"1"/"yes" (case-insensitive); anything
/// else is `false`. Action variables accept the names understood by
/// [`ReferenceAction`]'s `FromStr`, or an empty string to clear the default.
///
/// # Errors
///
/// Returns [`SchemaPlusError::InvalidOption`] for an unknown action name.
pub fn apply_env_overrides(settings: &mut Settings) -> Result<(), SchemaPlusError> {
    if let Ok(val) = std::env::var("SCHEMAPLUS_DEBUG") {
        settings.debug = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("SCHEMAPLUS_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("SCHEMAPLUS_AUTO_CREATE") {
        settings.foreign_keys.auto_create = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("SCHEMAPLUS_AUTO_INDEX") {
        settings.foreign_keys.auto_index = parse_bool(&val);
    }

    if let Ok(val) = std::env::var("SCHEMAPLUS_ON_UPDATE") {
        settings.foreign_keys.on_update = parse_action(&val)?;
    }

    if let Ok(val) = std::env::var("SCHEMAPLUS_ON_DELETE") {
        settings.foreign_keys.on_delete = parse_action(&val)?;
    }

    Ok(())
}

// ============================================================
// Helpers
// ============================================================

fn parse_bool(val: &str) -> bool {
    matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_action(val: &str) -> Result<Option<ReferenceAction>, SchemaPlusError> {
    if val.trim().is_empty() {
        return Ok(None);
    }
    val.parse().map(Some)
}

/// Deep-merges a parsed document over the serialized defaults and
/// deserializes the result.
fn merge_over_defaults(
    value: serde_json::Value,
    format: &str,
) -> Result<Settings, SchemaPlusError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        SchemaPlusError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        SchemaPlusError::ConfigurationError(format!(
            "Failed to deserialize settings from {format}: {e}"
        ))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
