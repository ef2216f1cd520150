//! Foreign key inference from column names and configuration.
//!
//! [`infer_foreign_key`] is a pure function: given a column's identity, its
//! normalized options, and the effective [`ForeignKeyConfig`], it decides
//! whether a foreign key should exist and what it references.
//!
//! The referenced table of an `owner_id` column is derived by stripping the
//! `_id` suffix and handing the stem to a [`TableNaming`] strategy, which
//! pluralizes it by default.

use std::fmt;

use schemaplus_core::utils::text::pluralize;
use schemaplus_core::ForeignKeyConfig;

use crate::foreign_key::ConstraintOptions;
use crate::options::{ColumnOptions, ForeignKeyOption, ForeignKeyOptions, References};

/// Maps the stem of a reference column (`owner` for `owner_id`) to the name
/// of the referenced table.
pub trait TableNaming: Send + Sync + fmt::Debug {
    /// Returns the table name for `stem`.
    fn table_name(&self, stem: &str) -> String;
}

/// English pluralization: `owner` -> `owners`, `category` -> `categories`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pluralized;

impl TableNaming for Pluralized {
    fn table_name(&self, stem: &str) -> String {
        pluralize(stem)
    }
}

/// Uses the stem as-is: `owner` -> `owner`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl TableNaming for Verbatim {
    fn table_name(&self, stem: &str) -> String {
        stem.to_string()
    }
}

/// The referenced side of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTarget {
    /// The referenced table.
    pub table: String,
    /// The referenced column.
    pub column: String,
}

/// Everything needed to emit a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyArgs {
    /// What the foreign key references.
    pub references: ReferenceTarget,
    /// Name, actions, and deferrability.
    pub options: ConstraintOptions,
}

/// The outcome of foreign key inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inference {
    /// The migration explicitly turned the foreign key off.
    Disabled,
    /// No foreign key was requested or inferred.
    NotPlanned,
    /// A foreign key should be created.
    Planned(ForeignKeyArgs),
}

impl Inference {
    /// Returns `true` if a decision about the foreign key was made, including
    /// an explicit "none".
    pub const fn is_decided(&self) -> bool {
        !matches!(self, Self::NotPlanned)
    }

    /// Returns the foreign key to create, if any.
    pub fn into_args(self) -> Option<ForeignKeyArgs> {
        match self {
            Self::Planned(args) => Some(args),
            Self::Disabled | Self::NotPlanned => None,
        }
    }
}

/// Infers the foreign key for `table.column`.
///
/// # Examples
///
/// ```
/// use schemaplus_core::ForeignKeyConfig;
/// use schemaplus_migrations::inference::{infer_foreign_key, Inference, Pluralized};
/// use schemaplus_migrations::options::ColumnOptions;
///
/// let inferred = infer_foreign_key(
///     "comments",
///     "post_id",
///     &ColumnOptions::new(),
///     &ForeignKeyConfig::default(),
///     &Pluralized,
/// );
/// let Inference::Planned(args) = inferred else { panic!() };
/// assert_eq!(args.references.table, "posts");
/// assert_eq!(args.references.column, "id");
/// ```
pub fn infer_foreign_key(
    table: &str,
    column: &str,
    options: &ColumnOptions,
    config: &ForeignKeyConfig,
    naming: &dyn TableNaming,
) -> Inference {
    let fk = match &options.foreign_key {
        Some(ForeignKeyOption::Flag(false)) => return Inference::Disabled,
        Some(ForeignKeyOption::Flag(true)) => ForeignKeyOptions::default(),
        Some(ForeignKeyOption::Options(fk)) => fk.clone(),
        None if config.auto_create && column.ends_with("_id") => ForeignKeyOptions::default(),
        None => return Inference::NotPlanned,
    };

    let (ref_table, ref_column) = match &fk.references {
        Some(References::Disabled) => return Inference::Disabled,
        Some(References::Table(ref_table)) => {
            (ref_table.clone(), References::DEFAULT_COLUMN.to_string())
        }
        Some(References::Column { table, column }) => (table.clone(), column.clone()),
        None if column == "parent_id" => (table.to_string(), References::DEFAULT_COLUMN.to_string()),
        None => {
            let stem = column.strip_suffix("_id").unwrap_or(column);
            (
                naming.table_name(stem),
                References::DEFAULT_COLUMN.to_string(),
            )
        }
    };

    Inference::Planned(ForeignKeyArgs {
        references: ReferenceTarget {
            table: ref_table,
            column: ref_column,
        },
        options: ConstraintOptions {
            name: fk.name,
            on_update: fk.on_update.or(config.on_update),
            on_delete: fk.on_delete.or(config.on_delete),
            deferrable: fk.deferrable,
        },
    })
}
