//! DDL sinks driven by the migration pipeline.
//!
//! The pipeline emits DDL through a [`Caller`], which is either an
//! in-progress [`TableDefinition`] (`create_table`) or a live-table mutator
//! implementing [`SchemaStatements`] (`add_column`, `change_table`, ...).
//! Errors raised by a sink propagate through the pipeline unmodified.

use serde::Serialize;

use schemaplus_core::SchemaPlusResult;

use crate::commands::CommandLog;
use crate::event::ColumnEvent;
use crate::foreign_key::{ConstraintOptions, ForeignKeyDefinition};
use crate::options::IndexOptions;
use crate::table_definition::TableDefinition;

/// Identifies an index to drop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexRemoval {
    /// The index name.
    pub name: Option<String>,
    /// The indexed column.
    pub column: Option<String>,
    /// Ignore a missing index instead of failing.
    pub if_exists: bool,
}

/// Schema statements against existing tables.
pub trait SchemaStatements {
    /// Performs the column definition described by `event`.
    fn apply_column(&mut self, event: &ColumnEvent) -> SchemaPlusResult<()>;

    /// Creates an index on `table.column`.
    fn add_index(
        &mut self,
        table: &str,
        column: &str,
        options: &IndexOptions,
    ) -> SchemaPlusResult<()>;

    /// Drops an index on `table`.
    fn remove_index(&mut self, table: &str, removal: &IndexRemoval) -> SchemaPlusResult<()>;

    /// Adds a foreign key from `table.column` to `references_table.references_column`.
    fn add_foreign_key(
        &mut self,
        table: &str,
        column: &str,
        references_table: &str,
        references_column: &str,
        options: &ConstraintOptions,
    ) -> SchemaPlusResult<()>;

    /// Drops the foreign key matching the given columns.
    fn remove_foreign_key(
        &mut self,
        table: &str,
        columns: &[String],
        references_table: &str,
        references_columns: &[String],
    ) -> SchemaPlusResult<()>;

    /// Lists the foreign keys defined on `table`.
    fn foreign_keys(&self, table: &str) -> SchemaPlusResult<Vec<ForeignKeyDefinition>>;

    /// Returns the command log while replaying a revert, `None` otherwise.
    fn reverting_log(&mut self) -> Option<&mut CommandLog> {
        None
    }
}

/// The sink a column event was issued against.
pub enum Caller<'a> {
    /// A table being created.
    Definition(&'a mut TableDefinition),
    /// An existing table being altered.
    Statements(&'a mut dyn SchemaStatements),
}

impl Caller<'_> {
    /// Performs the column definition itself; the terminal pipeline step.
    pub fn apply_column(&mut self, event: &ColumnEvent) -> SchemaPlusResult<()> {
        match self {
            Self::Definition(definition) => definition.apply_column(event),
            Self::Statements(statements) => statements.apply_column(event),
        }
    }

    /// Returns the command log when the caller is replaying a revert.
    pub fn reverting_log(&mut self) -> Option<&mut CommandLog> {
        match self {
            Self::Definition(_) => None,
            Self::Statements(statements) => statements.reverting_log(),
        }
    }
}

impl std::fmt::Debug for Caller<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Definition(definition) => f
                .debug_tuple("Definition")
                .field(&definition.name)
                .finish(),
            Self::Statements(_) => f.write_str("Statements"),
        }
    }
}
