//! Column options carried by migration events.
//!
//! [`ColumnOptions`] is the typed form of the option mapping a migration
//! passes when it adds, changes, or removes a column. Besides generic column
//! settings (`null`, `default`) it carries the foreign key controls the
//! planner reads:
//!
//! - `foreign_key`: `false`, `true`, or a [`ForeignKeyOptions`] map
//! - `index`: `false`, `true`, or an [`IndexOptions`] map
//! - `polymorphic`: marks a type+id reference pair
//! - shortcut forms of `references`, `on_update`, `on_delete`, `deferrable`
//!   written at the top level instead of inside `foreign_key`
//!
//! `references` distinguishes "absent" from "explicitly empty": an explicit
//! `null`, `false`, or `""` deserializes to [`References::Disabled`], which
//! disables the foreign key entirely.

use serde::{Deserialize, Deserializer, Serialize};

use schemaplus_core::ReferenceAction;

/// Deserializes a field that is present in the input, even as `null`.
///
/// Combined with `#[serde(default)]` this gives a tri-state field: absent
/// keys stay `None` while `null` is handed to `T`'s own deserializer.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

// ── References ───────────────────────────────────────────────────────

/// The target of a foreign key as written in column options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReferences", into = "RawReferences")]
pub enum References {
    /// An explicit "no reference": the foreign key is disabled.
    Disabled,
    /// A referenced table; the referenced column defaults to `id`.
    Table(String),
    /// A referenced table and column.
    Column {
        /// The referenced table.
        table: String,
        /// The referenced column.
        column: String,
    },
}

impl References {
    /// The column referenced when only a table is given.
    pub const DEFAULT_COLUMN: &'static str = "id";

    /// Creates a table reference.
    pub fn table(table: impl Into<String>) -> Self {
        Self::Table(table.into())
    }

    /// Creates a table + column reference.
    pub fn column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Column {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Returns `true` for an explicit "no reference".
    pub const fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Returns the `(table, column)` pair, filling in the default column.
    pub fn target(&self) -> Option<(String, String)> {
        match self {
            Self::Disabled => None,
            Self::Table(table) => Some((table.clone(), Self::DEFAULT_COLUMN.to_string())),
            Self::Column { table, column } => Some((table.clone(), column.clone())),
        }
    }
}

/// Wire form of [`References`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawReferences {
    Flag(bool),
    Table(String),
    Pair(String, String),
    Null(()),
}

impl TryFrom<RawReferences> for References {
    type Error = String;

    fn try_from(raw: RawReferences) -> Result<Self, Self::Error> {
        match raw {
            RawReferences::Null(()) | RawReferences::Flag(false) => Ok(Self::Disabled),
            RawReferences::Flag(true) => {
                Err("`references: true` does not name a table".to_string())
            }
            RawReferences::Table(table) if table.is_empty() => Ok(Self::Disabled),
            RawReferences::Table(table) => Ok(Self::Table(table)),
            RawReferences::Pair(table, column) => Ok(Self::Column { table, column }),
        }
    }
}

impl From<References> for RawReferences {
    fn from(references: References) -> Self {
        match references {
            References::Disabled => Self::Flag(false),
            References::Table(table) => Self::Table(table),
            References::Column { table, column } => Self::Pair(table, column),
        }
    }
}

// ── Deferrable ───────────────────────────────────────────────────────

/// Whether a foreign key constraint check may be deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Deferrable {
    /// `true` makes the constraint `DEFERRABLE`; `false` leaves it immediate.
    Flag(bool),
    /// An explicit initial check mode.
    Mode(DeferrableMode),
}

/// Initial check mode of a deferrable constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferrableMode {
    /// `DEFERRABLE INITIALLY DEFERRED`
    InitiallyDeferred,
    /// `DEFERRABLE INITIALLY IMMEDIATE`
    InitiallyImmediate,
}

impl Deferrable {
    /// Returns the SQL clause, or `None` for a non-deferrable constraint.
    pub const fn sql(self) -> Option<&'static str> {
        match self {
            Self::Flag(false) => None,
            Self::Flag(true) => Some("DEFERRABLE"),
            Self::Mode(DeferrableMode::InitiallyDeferred) => Some("DEFERRABLE INITIALLY DEFERRED"),
            Self::Mode(DeferrableMode::InitiallyImmediate) => {
                Some("DEFERRABLE INITIALLY IMMEDIATE")
            }
        }
    }
}

// ── Foreign key ──────────────────────────────────────────────────────

/// The `foreign_key` column option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForeignKeyOption {
    /// `false` disables the foreign key; `true` requests one with defaults.
    Flag(bool),
    /// A foreign key with explicit settings.
    Options(ForeignKeyOptions),
}

impl ForeignKeyOption {
    /// Returns `true` for an explicit `foreign_key: false`.
    pub const fn is_disabled(&self) -> bool {
        matches!(self, Self::Flag(false))
    }
}

impl From<bool> for ForeignKeyOption {
    fn from(enabled: bool) -> Self {
        Self::Flag(enabled)
    }
}

impl From<ForeignKeyOptions> for ForeignKeyOption {
    fn from(options: ForeignKeyOptions) -> Self {
        Self::Options(options)
    }
}

/// Explicit foreign key settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyOptions {
    /// The referenced table (and optionally column).
    #[serde(
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub references: Option<References>,
    /// Constraint name; generated from table and column when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `ON UPDATE` action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferenceAction>,
    /// `ON DELETE` action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferenceAction>,
    /// Deferrability of the constraint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferrable: Option<Deferrable>,
}

impl ForeignKeyOptions {
    /// Creates empty foreign key options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the referenced table or table + column.
    #[must_use]
    pub fn references(mut self, references: References) -> Self {
        self.references = Some(references);
        self
    }

    /// Sets the constraint name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the `ON UPDATE` action.
    #[must_use]
    pub const fn on_update(mut self, action: ReferenceAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Sets the `ON DELETE` action.
    #[must_use]
    pub const fn on_delete(mut self, action: ReferenceAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets deferrability.
    #[must_use]
    pub const fn deferrable(mut self, deferrable: Deferrable) -> Self {
        self.deferrable = Some(deferrable);
        self
    }
}

// ── Index ────────────────────────────────────────────────────────────

/// The `index` column option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexOption {
    /// `false` suppresses the index; `true` requests one with defaults.
    Flag(bool),
    /// An index with explicit settings.
    Options(IndexOptions),
}

impl From<bool> for IndexOption {
    fn from(enabled: bool) -> Self {
        Self::Flag(enabled)
    }
}

impl From<IndexOptions> for IndexOption {
    fn from(options: IndexOptions) -> Self {
        Self::Options(options)
    }
}

impl IndexOption {
    /// Resolves the option into concrete index settings, or `None` when the
    /// index is suppressed.
    pub fn resolve(&self) -> Option<IndexOptions> {
        match self {
            Self::Flag(false) => None,
            Self::Flag(true) => Some(IndexOptions::default()),
            Self::Options(options) => Some(options.clone()),
        }
    }
}

/// Explicit index settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Index name; generated from table and column when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Creates a `UNIQUE` index.
    #[serde(skip_serializing_if = "is_false")]
    pub unique: bool,
    /// Partial index predicate.
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl IndexOptions {
    /// Creates index options with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Marks the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

// ── Column options ───────────────────────────────────────────────────

/// The option mapping passed with a column definition.
///
/// # Examples
///
/// ```
/// use schemaplus_migrations::options::{ColumnOptions, ForeignKeyOption};
///
/// let options: ColumnOptions =
///     serde_json::from_str(r#"{"references": "users", "on_delete": "cascade"}"#).unwrap();
/// assert!(options.references.is_some());
/// assert!(options.foreign_key.is_none());
///
/// let options = ColumnOptions::new().foreign_key(false);
/// assert_eq!(options.foreign_key, Some(ForeignKeyOption::Flag(false)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOptions {
    /// Foreign key control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyOption>,
    /// Index control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexOption>,
    /// Marks a polymorphic (type + id) reference.
    #[serde(skip_serializing_if = "is_false")]
    pub polymorphic: bool,
    /// Shortcut for `foreign_key.references`.
    #[serde(
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub references: Option<References>,
    /// Shortcut for `foreign_key.on_update`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferenceAction>,
    /// Shortcut for `foreign_key.on_delete`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferenceAction>,
    /// Shortcut for `foreign_key.deferrable`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferrable: Option<Deferrable>,
    /// Column nullability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null: Option<bool>,
    /// Column default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl ColumnOptions {
    /// Creates an empty option mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `foreign_key` option.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: impl Into<ForeignKeyOption>) -> Self {
        self.foreign_key = Some(foreign_key.into());
        self
    }

    /// Sets the `index` option.
    #[must_use]
    pub fn index(mut self, index: impl Into<IndexOption>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Marks the reference polymorphic.
    #[must_use]
    pub const fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }

    /// Sets the top-level `references` shortcut.
    #[must_use]
    pub fn references(mut self, references: References) -> Self {
        self.references = Some(references);
        self
    }

    /// Sets the top-level `on_update` shortcut.
    #[must_use]
    pub const fn on_update(mut self, action: ReferenceAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// Sets the top-level `on_delete` shortcut.
    #[must_use]
    pub const fn on_delete(mut self, action: ReferenceAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Sets the top-level `deferrable` shortcut.
    #[must_use]
    pub const fn deferrable(mut self, deferrable: Deferrable) -> Self {
        self.deferrable = Some(deferrable);
        self
    }

    /// Sets column nullability.
    #[must_use]
    pub const fn null(mut self, null: bool) -> Self {
        self.null = Some(null);
        self
    }

    /// Sets the column default.
    #[must_use]
    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }
}
