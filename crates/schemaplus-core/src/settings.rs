//! Settings system for schemaplus.
//!
//! This module provides the [`Settings`] struct, which holds process-wide
//! configuration, the [`ForeignKeyConfig`] consulted by the foreign key
//! planner, and [`LazySettings`], a globally-accessible, lazily-initialized
//! settings instance.
//!
//! Settings are configured once at startup. A migration run that needs
//! different behavior takes a merged copy via [`ForeignKeyConfig::merge`]
//! and passes it explicitly; the global value is never mutated afterwards.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaPlusError, SchemaPlusResult};

/// Referential action taken by the database when a referenced row is
/// updated or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceAction {
    /// Propagate the update or delete to referencing rows.
    Cascade,
    /// Reject the update or delete.
    Restrict,
    /// Set the referencing column to `NULL`.
    Nullify,
    /// Set the referencing column to its default.
    SetDefault,
    /// Defer the check; the database reports violations at statement end.
    #[serde(alias = "none")]
    NoAction,
}

impl ReferenceAction {
    /// Returns the SQL keyword(s) for this action.
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::Nullify => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }
}

impl fmt::Display for ReferenceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cascade => "cascade",
            Self::Restrict => "restrict",
            Self::Nullify => "nullify",
            Self::SetDefault => "set_default",
            Self::NoAction => "no_action",
        };
        f.write_str(name)
    }
}

impl FromStr for ReferenceAction {
    type Err = SchemaPlusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cascade" => Ok(Self::Cascade),
            "restrict" => Ok(Self::Restrict),
            "nullify" | "set_null" => Ok(Self::Nullify),
            "set_default" => Ok(Self::SetDefault),
            "no_action" | "none" => Ok(Self::NoAction),
            other => Err(SchemaPlusError::InvalidOption(format!(
                "unknown referential action '{other}'"
            ))),
        }
    }
}

/// Foreign key planning configuration.
///
/// Controls whether foreign keys are inferred from the `_id` naming
/// convention, whether a supporting index is created alongside each planned
/// foreign key, and which referential actions inferred foreign keys get when
/// the migration does not name one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConfig {
    /// Infer foreign keys for columns suffixed with `_id`.
    pub auto_create: bool,
    /// Create an index whenever a foreign key is planned.
    pub auto_index: bool,
    /// Default `ON UPDATE` action; `None` leaves it to the database.
    pub on_update: Option<ReferenceAction>,
    /// Default `ON DELETE` action; `None` leaves it to the database.
    pub on_delete: Option<ReferenceAction>,
}

impl Default for ForeignKeyConfig {
    fn default() -> Self {
        Self {
            auto_create: true,
            auto_index: true,
            on_update: None,
            on_delete: None,
        }
    }
}

impl ForeignKeyConfig {
    /// Returns a copy of this configuration with the given overrides applied.
    ///
    /// # Examples
    ///
    /// ```
    /// use schemaplus_core::settings::{ConfigOverrides, ForeignKeyConfig, ReferenceAction};
    ///
    /// let base = ForeignKeyConfig::default();
    /// let scoped = base.merge(
    ///     ConfigOverrides::new()
    ///         .auto_index(false)
    ///         .on_delete(Some(ReferenceAction::Cascade)),
    /// );
    /// assert!(scoped.auto_create);
    /// assert!(!scoped.auto_index);
    /// assert_eq!(scoped.on_delete, Some(ReferenceAction::Cascade));
    /// ```
    #[must_use]
    pub fn merge(&self, overrides: ConfigOverrides) -> Self {
        let mut merged = self.clone();
        if let Some(auto_create) = overrides.auto_create {
            merged.auto_create = auto_create;
        }
        if let Some(auto_index) = overrides.auto_index {
            merged.auto_index = auto_index;
        }
        if let Some(on_update) = overrides.on_update {
            merged.on_update = on_update;
        }
        if let Some(on_delete) = overrides.on_delete {
            merged.on_delete = on_delete;
        }
        merged
    }
}

/// A partial set of [`ForeignKeyConfig`] values for [`ForeignKeyConfig::merge`].
///
/// Unset fields keep the base value. The referential actions are doubly
/// optional so an override can explicitly clear a default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    auto_create: Option<bool>,
    auto_index: Option<bool>,
    on_update: Option<Option<ReferenceAction>>,
    on_delete: Option<Option<ReferenceAction>>,
}

impl ConfigOverrides {
    /// Creates an empty set of overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides `auto_create`.
    #[must_use]
    pub const fn auto_create(mut self, value: bool) -> Self {
        self.auto_create = Some(value);
        self
    }

    /// Overrides `auto_index`.
    #[must_use]
    pub const fn auto_index(mut self, value: bool) -> Self {
        self.auto_index = Some(value);
        self
    }

    /// Overrides `on_update`.
    #[must_use]
    pub const fn on_update(mut self, value: Option<ReferenceAction>) -> Self {
        self.on_update = Some(value);
        self
    }

    /// Overrides `on_delete`.
    #[must_use]
    pub const fn on_delete(mut self, value: Option<ReferenceAction>) -> Self {
        self.on_delete = Some(value);
        self
    }
}

/// Process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Enables human-readable log output.
    pub debug: bool,
    /// Log filter directive (e.g. "info", "schemaplus_migrations=debug").
    pub log_level: String,
    /// Foreign key planning configuration.
    pub foreign_keys: ForeignKeyConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
            foreign_keys: ForeignKeyConfig::default(),
        }
    }
}

/// A lazily-initialized, globally-accessible settings container.
///
/// Call [`configure`](LazySettings::configure) or
/// [`setup`](LazySettings::setup) once at startup. Reading the settings
/// before configuring them freezes the defaults in place.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new unconfigured settings container.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Installs the settings.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaPlusError::ImproperlyConfigured`] if settings were
    /// already configured or already read.
    pub fn configure(&self, settings: Settings) -> SchemaPlusResult<()> {
        self.inner.set(settings).map_err(|_| {
            SchemaPlusError::ImproperlyConfigured("settings are already configured".to_string())
        })
    }

    /// Configures settings by mutating a default instance.
    ///
    /// ```
    /// use schemaplus_core::settings::LazySettings;
    ///
    /// let settings = LazySettings::new();
    /// settings
    ///     .setup(|s| s.foreign_keys.auto_create = false)
    ///     .unwrap();
    /// assert!(!settings.foreign_keys().auto_create);
    /// ```
    pub fn setup(&self, configure: impl FnOnce(&mut Settings)) -> SchemaPlusResult<()> {
        let mut settings = Settings::default();
        configure(&mut settings);
        self.configure(settings)
    }

    /// Returns the configured settings, or the defaults if none were set.
    pub fn get(&self) -> &Settings {
        self.inner.get_or_init(Settings::default)
    }

    /// Returns the process-wide foreign key configuration.
    pub fn foreign_keys(&self) -> &ForeignKeyConfig {
        &self.get().foreign_keys
    }

    /// Returns whether settings have been configured (or read).
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.debug);
        assert_eq!(settings.log_level, "info");
        assert!(settings.foreign_keys.auto_create);
        assert!(settings.foreign_keys.auto_index);
        assert_eq!(settings.foreign_keys.on_update, None);
        assert_eq!(settings.foreign_keys.on_delete, None);
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let base = ForeignKeyConfig {
            on_update: Some(ReferenceAction::Restrict),
            ..ForeignKeyConfig::default()
        };
        let merged = base.merge(ConfigOverrides::new().auto_create(false));
        assert!(!merged.auto_create);
        assert!(merged.auto_index);
        assert_eq!(merged.on_update, Some(ReferenceAction::Restrict));
        // The base is untouched.
        assert!(base.auto_create);
    }

    #[test]
    fn test_merge_can_clear_action() {
        let base = ForeignKeyConfig {
            on_delete: Some(ReferenceAction::Cascade),
            ..ForeignKeyConfig::default()
        };
        let merged = base.merge(ConfigOverrides::new().on_delete(None));
        assert_eq!(merged.on_delete, None);
    }

    #[test]
    fn test_lazy_settings_configure_once() {
        let settings = LazySettings::new();
        assert!(!settings.is_configured());
        settings.configure(Settings::default()).unwrap();
        assert!(settings.is_configured());
        let err = settings.configure(Settings::default()).unwrap_err();
        assert!(matches!(err, SchemaPlusError::ImproperlyConfigured(_)));
    }

    #[test]
    fn test_lazy_settings_get_defaults() {
        let settings = LazySettings::new();
        assert!(settings.foreign_keys().auto_index);
        assert!(settings.is_configured());
    }

    #[test]
    fn test_reference_action_from_str() {
        assert_eq!("cascade".parse::<ReferenceAction>().unwrap(), ReferenceAction::Cascade);
        assert_eq!("NULLIFY".parse::<ReferenceAction>().unwrap(), ReferenceAction::Nullify);
        assert_eq!("none".parse::<ReferenceAction>().unwrap(), ReferenceAction::NoAction);
        assert!("explode".parse::<ReferenceAction>().is_err());
    }

    #[test]
    fn test_reference_action_serde() {
        let action: ReferenceAction = serde_json::from_str("\"set_default\"").unwrap();
        assert_eq!(action, ReferenceAction::SetDefault);
        let action: ReferenceAction = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(action, ReferenceAction::NoAction);
        assert_eq!(
            serde_json::to_string(&ReferenceAction::Nullify).unwrap(),
            "\"nullify\""
        );
    }

    #[test]
    fn test_reference_action_sql() {
        assert_eq!(ReferenceAction::Nullify.sql(), "SET NULL");
        assert_eq!(ReferenceAction::NoAction.sql(), "NO ACTION");
        assert_eq!(ReferenceAction::SetDefault.to_string(), "set_default");
    }
}
