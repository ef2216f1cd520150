//! Column events passed through the migration pipeline.
//!
//! A [`ColumnEvent`] describes one column definition being added, changed,
//! or removed. Middleware mutate its [`ColumnOptions`] on the way in; the
//! foreign key planner takes a snapshot of the options before mutating them
//! so that its post-processing sees the caller's original intent.

use serde::{Deserialize, Serialize};

use crate::options::ColumnOptions;

/// The kind of change made to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A new column.
    Add,
    /// An existing column is redefined.
    Change,
    /// A column is dropped.
    Remove,
}

/// Whether the event defines a plain column or a belongs-to reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// A plain column (`add_column`, `t.integer`).
    Column,
    /// A reference column (`add_reference`, `t.references`).
    Reference,
}

/// The column type used for reference columns.
pub const REFERENCE_COLUMN_TYPE: &str = "bigint";

/// A single column definition flowing through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnEvent {
    /// The kind of change.
    pub operation: Operation,
    /// Plain column or reference.
    pub kind: ColumnKind,
    /// The table being built or altered.
    pub table_name: String,
    /// The column name. For references this is the `_id` column.
    pub column_name: String,
    /// The column type (e.g. `integer`, `string`).
    pub column_type: Option<String>,
    /// The column options; mutable across the pipeline.
    pub options: ColumnOptions,
    snapshot: Option<ColumnOptions>,
}

impl ColumnEvent {
    /// Creates a new event.
    pub fn new(
        operation: Operation,
        kind: ColumnKind,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            table_name: table_name.into(),
            column_name: column_name.into(),
            column_type: None,
            options: ColumnOptions::default(),
            snapshot: None,
        }
    }

    /// Creates an event adding a plain column.
    pub fn add_column(
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        column_type: impl Into<String>,
    ) -> Self {
        Self::new(Operation::Add, ColumnKind::Column, table_name, column_name)
            .with_type(column_type)
    }

    /// Creates an event changing a plain column.
    pub fn change_column(
        table_name: impl Into<String>,
        column_name: impl Into<String>,
        column_type: impl Into<String>,
    ) -> Self {
        Self::new(Operation::Change, ColumnKind::Column, table_name, column_name)
            .with_type(column_type)
    }

    /// Creates an event adding a reference. `name` is the association name
    /// (`post`); the event's column is `post_id`.
    pub fn add_reference(table_name: impl Into<String>, name: &str) -> Self {
        Self::new(
            Operation::Add,
            ColumnKind::Reference,
            table_name,
            format!("{name}_id"),
        )
        .with_type(REFERENCE_COLUMN_TYPE)
    }

    /// Sets the column type.
    #[must_use]
    pub fn with_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    /// Sets the column options.
    #[must_use]
    pub fn with_options(mut self, options: ColumnOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns `true` if the event declares a belongs-to style reference.
    pub fn is_reference(&self) -> bool {
        self.kind == ColumnKind::Reference
    }

    /// Returns `true` for a polymorphic reference.
    pub fn is_polymorphic(&self) -> bool {
        self.is_reference() && self.options.polymorphic
    }

    /// The association name of a reference (`post` for `post_id`).
    pub fn reference_name(&self) -> &str {
        self.column_name
            .strip_suffix("_id")
            .unwrap_or(&self.column_name)
    }

    /// Records the current options so they can be restored later.
    pub fn snapshot_options(&mut self) {
        self.snapshot = Some(self.options.clone());
    }

    /// Restores the options recorded by [`snapshot_options`](Self::snapshot_options).
    ///
    /// Returns `false` if no snapshot was taken.
    pub fn restore_options(&mut self) -> bool {
        match self.snapshot.take() {
            Some(options) => {
                self.options = options;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ForeignKeyOption, IndexOption};

    #[test]
    fn test_add_reference_column_name() {
        let event = ColumnEvent::add_reference("comments", "post");
        assert_eq!(event.column_name, "post_id");
        assert_eq!(event.reference_name(), "post");
        assert_eq!(event.column_type.as_deref(), Some(REFERENCE_COLUMN_TYPE));
        assert!(event.is_reference());
        assert!(!event.is_polymorphic());
    }

    #[test]
    fn test_is_polymorphic_requires_reference() {
        let column = ColumnEvent::add_column("widgets", "owner_id", "integer")
            .with_options(ColumnOptions::new().polymorphic());
        assert!(!column.is_polymorphic());

        let reference = ColumnEvent::add_reference("pictures", "imageable")
            .with_options(ColumnOptions::new().polymorphic());
        assert!(reference.is_polymorphic());
    }

    #[test]
    fn test_snapshot_and_restore() {
        let mut event = ColumnEvent::add_column("widgets", "owner_id", "integer")
            .with_options(ColumnOptions::new().index(true));
        event.snapshot_options();
        event.options.index = None;
        event.options.foreign_key = Some(ForeignKeyOption::Flag(false));

        assert!(event.restore_options());
        assert_eq!(event.options.index, Some(IndexOption::Flag(true)));
        assert_eq!(event.options.foreign_key, None);
        // The snapshot is consumed.
        assert!(!event.restore_options());
    }
}
