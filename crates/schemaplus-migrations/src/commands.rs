//! Recorded DDL commands and the command log.
//!
//! Every DDL operation a live-table sink performs is recorded as a
//! [`Command`] in a [`CommandLog`]. The log supports revert replay: each
//! command knows its inverse, and [`CommandLog::strip_additive_since`]
//! drops additive (`add_*`) commands appended after a marker while keeping
//! the survivors in order.

use serde::Serialize;

use schemaplus_core::{SchemaPlusError, SchemaPlusResult};

use crate::foreign_key::{default_foreign_key_name, default_index_name, ForeignKeyDefinition};
use crate::options::{ColumnOptions, IndexOptions};
use crate::table_definition::TableDefinition;

/// A single recorded DDL command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// `CREATE TABLE` with inline columns, indexes, and foreign keys.
    CreateTable(TableDefinition),
    /// `DROP TABLE`.
    DropTable {
        /// The dropped table.
        table: String,
    },
    /// `ALTER TABLE ... ADD COLUMN`.
    AddColumn {
        /// The altered table.
        table: String,
        /// The new column.
        column: String,
        /// The column type.
        column_type: String,
        /// Options passed to the column definition.
        options: ColumnOptions,
    },
    /// `ALTER TABLE ... ALTER COLUMN`.
    ChangeColumn {
        /// The altered table.
        table: String,
        /// The changed column.
        column: String,
        /// The new column type.
        column_type: String,
        /// Options passed to the column definition.
        options: ColumnOptions,
    },
    /// `ALTER TABLE ... DROP COLUMN`.
    RemoveColumn {
        /// The altered table.
        table: String,
        /// The dropped column.
        column: String,
        /// The column type, needed to reverse the removal.
        column_type: Option<String>,
        /// Options of the dropped column.
        options: ColumnOptions,
    },
    /// Adds a `{name}_id` reference column (and `{name}_type` when polymorphic).
    AddReference {
        /// The altered table.
        table: String,
        /// The association name.
        name: String,
        /// Options passed to the reference.
        options: ColumnOptions,
    },
    /// Drops a reference column pair.
    RemoveReference {
        /// The altered table.
        table: String,
        /// The association name.
        name: String,
        /// Options of the dropped reference.
        options: ColumnOptions,
    },
    /// `CREATE INDEX`.
    AddIndex {
        /// The indexed table.
        table: String,
        /// The indexed column.
        column: String,
        /// Index settings.
        options: IndexOptions,
    },
    /// `DROP INDEX`.
    RemoveIndex {
        /// The indexed table.
        table: String,
        /// The index name.
        name: Option<String>,
        /// The indexed column.
        column: Option<String>,
        /// Ignore a missing index.
        if_exists: bool,
    },
    /// `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`.
    AddForeignKey(ForeignKeyDefinition),
    /// `ALTER TABLE ... DROP CONSTRAINT`.
    RemoveForeignKey {
        /// The constrained table.
        table: String,
        /// The constrained columns.
        columns: Vec<String>,
        /// The referenced table.
        references_table: String,
        /// The referenced columns.
        references_columns: Vec<String>,
        /// The constraint name, when known.
        name: Option<String>,
    },
}

impl Command {
    /// Returns the operation name (`add_index`, `remove_foreign_key`, ...).
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateTable(_) => "create_table",
            Self::DropTable { .. } => "drop_table",
            Self::AddColumn { .. } => "add_column",
            Self::ChangeColumn { .. } => "change_column",
            Self::RemoveColumn { .. } => "remove_column",
            Self::AddReference { .. } => "add_reference",
            Self::RemoveReference { .. } => "remove_reference",
            Self::AddIndex { .. } => "add_index",
            Self::RemoveIndex { .. } => "remove_index",
            Self::AddForeignKey(_) => "add_foreign_key",
            Self::RemoveForeignKey { .. } => "remove_foreign_key",
        }
    }

    /// Returns `true` for additive commands (`add_*`).
    pub fn is_additive(&self) -> bool {
        self.name().starts_with("add_")
    }

    /// Returns the table the command operates on.
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable(definition) => &definition.name,
            Self::AddForeignKey(fk) => &fk.table_name,
            Self::DropTable { table }
            | Self::AddColumn { table, .. }
            | Self::ChangeColumn { table, .. }
            | Self::RemoveColumn { table, .. }
            | Self::AddReference { table, .. }
            | Self::RemoveReference { table, .. }
            | Self::AddIndex { table, .. }
            | Self::RemoveIndex { table, .. }
            | Self::RemoveForeignKey { table, .. } => table,
        }
    }

    /// Returns the command that undoes this one.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaPlusError::IrreversibleMigration`] for `change_column`,
    /// `drop_table`, a `remove_column` without a type, and a `remove_index`
    /// without a column.
    pub fn inverse(&self) -> SchemaPlusResult<Self> {
        match self {
            Self::CreateTable(definition) => Ok(Self::DropTable {
                table: definition.name.clone(),
            }),
            Self::AddColumn {
                table,
                column,
                column_type,
                options,
            } => Ok(Self::RemoveColumn {
                table: table.clone(),
                column: column.clone(),
                column_type: Some(column_type.clone()),
                options: options.clone(),
            }),
            Self::RemoveColumn {
                table,
                column,
                column_type: Some(column_type),
                options,
            } => Ok(Self::AddColumn {
                table: table.clone(),
                column: column.clone(),
                column_type: column_type.clone(),
                options: options.clone(),
            }),
            Self::AddReference {
                table,
                name,
                options,
            } => Ok(Self::RemoveReference {
                table: table.clone(),
                name: name.clone(),
                options: options.clone(),
            }),
            Self::RemoveReference {
                table,
                name,
                options,
            } => Ok(Self::AddReference {
                table: table.clone(),
                name: name.clone(),
                options: options.clone(),
            }),
            Self::AddIndex {
                table,
                column,
                options,
            } => Ok(Self::RemoveIndex {
                table: table.clone(),
                name: Some(
                    options
                        .name
                        .clone()
                        .unwrap_or_else(|| default_index_name(table, &[column.clone()])),
                ),
                column: Some(column.clone()),
                if_exists: false,
            }),
            Self::RemoveIndex {
                table,
                name,
                column: Some(column),
                ..
            } => Ok(Self::AddIndex {
                table: table.clone(),
                column: column.clone(),
                options: IndexOptions {
                    name: name.clone(),
                    ..IndexOptions::default()
                },
            }),
            Self::AddForeignKey(fk) => Ok(Self::RemoveForeignKey {
                table: fk.table_name.clone(),
                columns: fk.column_names.clone(),
                references_table: fk.references_table_name.clone(),
                references_columns: fk.references_column_names.clone(),
                name: Some(fk.name.clone()),
            }),
            Self::RemoveForeignKey {
                table,
                columns,
                references_table,
                references_columns,
                name,
            } => Ok(Self::AddForeignKey(ForeignKeyDefinition {
                table_name: table.clone(),
                column_names: columns.clone(),
                references_table_name: references_table.clone(),
                references_column_names: references_columns.clone(),
                name: name
                    .clone()
                    .unwrap_or_else(|| default_foreign_key_name(table, columns)),
                on_update: None,
                on_delete: None,
                deferrable: None,
            })),
            Self::DropTable { .. }
            | Self::ChangeColumn { .. }
            | Self::RemoveColumn { .. }
            | Self::RemoveIndex { .. } => Err(SchemaPlusError::IrreversibleMigration(format!(
                "{} on \"{}\" cannot be reverted",
                self.name(),
                self.table()
            ))),
        }
    }
}

/// Drops every additive command at or after `marker`, keeping the relative
/// order of the survivors. Commands before `marker` are untouched.
pub fn strip_additive(commands: &[Command], marker: usize) -> Vec<Command> {
    let marker = marker.min(commands.len());
    let (kept, tail) = commands.split_at(marker);
    kept.iter()
        .chain(tail.iter().filter(|command| !command.is_additive()))
        .cloned()
        .collect()
}

/// The ordered sequence of commands recorded during a migration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CommandLog {
    commands: Vec<Command>,
}

impl CommandLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Returns the number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns the recorded commands.
    pub fn as_slice(&self) -> &[Command] {
        &self.commands
    }

    /// Returns an iterator over the recorded commands.
    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Consumes the log, returning the commands.
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Drops additive commands recorded at or after `marker`.
    ///
    /// Returns the number of commands removed.
    pub fn strip_additive_since(&mut self, marker: usize) -> usize {
        let before = self.commands.len();
        self.commands = strip_additive(&self.commands, marker);
        before - self.commands.len()
    }
}

impl From<Vec<Command>> for CommandLog {
    fn from(commands: Vec<Command>) -> Self {
        Self { commands }
    }
}

impl<'a> IntoIterator for &'a CommandLog {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
