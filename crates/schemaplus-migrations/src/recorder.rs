//! Recording live-table sink.
//!
//! [`CommandRecorder`] implements [`SchemaStatements`] by appending each
//! operation to a [`CommandLog`]. It keeps a [`SchemaCatalog`] of the
//! foreign keys and indexes it knows about so that `foreign_keys(table)`
//! answers truthfully and `remove_index` with `if_exists` is a no-op when
//! the index is absent.
//!
//! A recorder created with [`CommandRecorder::reverting`] replays a revert
//! block: it records the inverse of every command instead of the command,
//! leaves its catalog untouched, and exposes its log to the foreign key
//! planner, which strips the additive inverses of its own removals.

use std::collections::BTreeMap;

use schemaplus_core::{SchemaPlusError, SchemaPlusResult};

use crate::caller::{IndexRemoval, SchemaStatements};
use crate::commands::{Command, CommandLog};
use crate::event::{ColumnEvent, ColumnKind, Operation};
use crate::foreign_key::{
    auto_index_name, default_index_name, ConstraintOptions, ForeignKeyDefinition,
};
use crate::options::IndexOptions;

/// Known foreign keys and indexes of the schema being migrated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaCatalog {
    foreign_keys: Vec<ForeignKeyDefinition>,
    /// `(table, name)` to the indexed columns; empty when not known.
    indexes: BTreeMap<(String, String), Vec<String>>,
}

impl SchemaCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an existing foreign key.
    #[must_use]
    pub fn with_foreign_key(mut self, foreign_key: ForeignKeyDefinition) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Registers an existing index.
    #[must_use]
    pub fn with_index(mut self, table: impl Into<String>, name: impl Into<String>) -> Self {
        self.indexes.insert((table.into(), name.into()), Vec::new());
        self
    }

    /// Returns the foreign keys of `table`.
    pub fn foreign_keys(&self, table: &str) -> Vec<ForeignKeyDefinition> {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.table_name == table)
            .cloned()
            .collect()
    }

    /// Returns `true` if an index with this name exists on `table`.
    pub fn has_index(&self, table: &str, name: &str) -> bool {
        self.indexes
            .contains_key(&(table.to_string(), name.to_string()))
    }

    fn add_index(&mut self, table: &str, name: String, columns: Vec<String>) {
        self.indexes.insert((table.to_string(), name), columns);
    }

    fn remove_index(&mut self, table: &str, name: &str) -> bool {
        self.indexes
            .remove(&(table.to_string(), name.to_string()))
            .is_some()
    }

    /// Forgets the foreign keys on a dropped column and its single-column
    /// indexes, including the auto-index.
    fn forget_column(&mut self, table: &str, column: &str) {
        self.foreign_keys
            .retain(|fk| !(fk.table_name == table && fk.column_names.iter().any(|c| c == column)));
        let auto_index = auto_index_name(table, column);
        self.indexes.retain(|(t, name), columns| {
            t != table || !(*name == auto_index || (columns.len() == 1 && columns[0] == column))
        });
    }

    fn drop_table(&mut self, table: &str) {
        self.foreign_keys.retain(|fk| fk.table_name != table);
        self.indexes.retain(|(t, _), _| t != table);
    }
}

/// A sink that records every DDL operation it receives.
#[derive(Debug, Clone, Default)]
pub struct CommandRecorder {
    log: CommandLog,
    reverting: bool,
    catalog: SchemaCatalog,
}

impl CommandRecorder {
    /// Creates a recorder over an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recorder over a schema with known foreign keys and indexes.
    pub fn with_catalog(catalog: SchemaCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    /// Creates a recorder that replays a revert block.
    pub fn reverting(catalog: SchemaCatalog) -> Self {
        Self {
            reverting: true,
            catalog,
            ..Self::default()
        }
    }

    /// Returns `true` while replaying a revert block.
    pub const fn is_reverting(&self) -> bool {
        self.reverting
    }

    /// Returns the recorded commands.
    pub fn commands(&self) -> &[Command] {
        self.log.as_slice()
    }

    /// Returns the command log.
    pub const fn log(&self) -> &CommandLog {
        &self.log
    }

    /// Returns the schema catalog.
    pub const fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// Consumes the recorder, returning the recorded commands.
    pub fn into_commands(self) -> Vec<Command> {
        self.log.into_commands()
    }

    /// Records a command and applies its effect to the catalog. While
    /// reverting, records the command's inverse instead.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaPlusError::SchemaError`] when removing a foreign key
    /// or index (without `if_exists`) that the catalog does not know, and
    /// [`SchemaPlusError::IrreversibleMigration`] while reverting a command
    /// that has no inverse.
    pub fn execute(&mut self, command: Command) -> SchemaPlusResult<()> {
        if self.reverting {
            return self.record_inverse(&command);
        }

        match &command {
            Command::CreateTable(definition) => {
                for fk in &definition.foreign_keys {
                    self.catalog.foreign_keys.push(fk.clone());
                }
                for index in &definition.indexes {
                    self.catalog.add_index(
                        &definition.name,
                        index.name(&definition.name),
                        index.columns.clone(),
                    );
                }
            }
            Command::DropTable { table } => self.catalog.drop_table(table),
            Command::RemoveColumn { table, column, .. } => {
                self.catalog.forget_column(table, column);
            }
            Command::RemoveReference { table, name, .. } => {
                self.catalog.forget_column(table, &format!("{name}_id"));
            }
            Command::AddIndex {
                table,
                column,
                options,
            } => {
                let name = options
                    .name
                    .clone()
                    .unwrap_or_else(|| default_index_name(table, &[column.clone()]));
                self.catalog.add_index(table, name, vec![column.clone()]);
            }
            Command::RemoveIndex {
                table,
                name,
                column,
                if_exists,
            } => {
                let name = match (name, column) {
                    (Some(name), _) => name.clone(),
                    (None, Some(column)) => default_index_name(table, &[column.clone()]),
                    (None, None) => {
                        return Err(SchemaPlusError::SchemaError(format!(
                            "remove_index on \"{table}\" needs a name or a column"
                        )))
                    }
                };
                if !self.catalog.remove_index(table, &name) {
                    if *if_exists {
                        tracing::trace!(table = %table, index = %name, "index absent; skipping removal");
                        return Ok(());
                    }
                    return Err(SchemaPlusError::SchemaError(format!(
                        "index \"{name}\" does not exist on \"{table}\""
                    )));
                }
            }
            Command::AddForeignKey(fk) => self.catalog.foreign_keys.push(fk.clone()),
            Command::RemoveForeignKey {
                table,
                columns,
                references_table,
                ..
            } => {
                let position = self.catalog.foreign_keys.iter().position(|fk| {
                    fk.table_name == *table
                        && fk.column_names == *columns
                        && fk.references_table_name == *references_table
                });
                match position {
                    Some(position) => {
                        self.catalog.foreign_keys.remove(position);
                    }
                    None => {
                        return Err(SchemaPlusError::SchemaError(format!(
                            "no foreign key on \"{table}\" ({}) references \"{references_table}\"",
                            columns.join(", ")
                        )))
                    }
                }
            }
            Command::AddColumn { .. }
            | Command::ChangeColumn { .. }
            | Command::AddReference { .. } => {}
        }

        tracing::debug!(command = command.name(), table = command.table(), "recorded");
        self.log.push(command);
        Ok(())
    }

    fn record_inverse(&mut self, command: &Command) -> SchemaPlusResult<()> {
        if let Command::RemoveIndex {
            table,
            name,
            column,
            if_exists: true,
        } = command
        {
            let name = name
                .clone()
                .or_else(|| column.as_ref().map(|c| default_index_name(table, &[c.clone()])));
            if !name.is_some_and(|name| self.catalog.has_index(table, &name)) {
                tracing::trace!(table = %table, "index absent; nothing to revert");
                return Ok(());
            }
        }

        let inverse = command.inverse()?;
        tracing::debug!(
            command = command.name(),
            inverse = inverse.name(),
            table = command.table(),
            "recorded inverse"
        );
        self.log.push(inverse);
        Ok(())
    }
}

impl SchemaStatements for CommandRecorder {
    fn apply_column(&mut self, event: &ColumnEvent) -> SchemaPlusResult<()> {
        let table = event.table_name.clone();
        let column_type = || {
            event.column_type.clone().ok_or_else(|| {
                SchemaPlusError::SchemaError(format!(
                    "column \"{}\" on \"{table}\" has no type",
                    event.column_name
                ))
            })
        };

        let command = match (event.operation, event.kind) {
            (Operation::Add, ColumnKind::Column) => Command::AddColumn {
                table: table.clone(),
                column: event.column_name.clone(),
                column_type: column_type()?,
                options: event.options.clone(),
            },
            (Operation::Change, _) => Command::ChangeColumn {
                table: table.clone(),
                column: event.column_name.clone(),
                column_type: column_type()?,
                options: event.options.clone(),
            },
            (Operation::Remove, ColumnKind::Column) => Command::RemoveColumn {
                table: table.clone(),
                column: event.column_name.clone(),
                column_type: event.column_type.clone(),
                options: event.options.clone(),
            },
            (Operation::Add, ColumnKind::Reference) => Command::AddReference {
                table: table.clone(),
                name: event.reference_name().to_string(),
                options: event.options.clone(),
            },
            (Operation::Remove, ColumnKind::Reference) => Command::RemoveReference {
                table: table.clone(),
                name: event.reference_name().to_string(),
                options: event.options.clone(),
            },
        };
        self.execute(command)
    }

    fn add_index(
        &mut self,
        table: &str,
        column: &str,
        options: &IndexOptions,
    ) -> SchemaPlusResult<()> {
        self.execute(Command::AddIndex {
            table: table.to_string(),
            column: column.to_string(),
            options: options.clone(),
        })
    }

    fn remove_index(&mut self, table: &str, removal: &IndexRemoval) -> SchemaPlusResult<()> {
        self.execute(Command::RemoveIndex {
            table: table.to_string(),
            name: removal.name.clone(),
            column: removal.column.clone(),
            if_exists: removal.if_exists,
        })
    }

    fn add_foreign_key(
        &mut self,
        table: &str,
        column: &str,
        references_table: &str,
        references_column: &str,
        options: &ConstraintOptions,
    ) -> SchemaPlusResult<()> {
        self.execute(Command::AddForeignKey(ForeignKeyDefinition::new(
            table,
            column,
            references_table,
            references_column,
            options,
        )))
    }

    fn remove_foreign_key(
        &mut self,
        table: &str,
        columns: &[String],
        references_table: &str,
        references_columns: &[String],
    ) -> SchemaPlusResult<()> {
        let name = self
            .catalog
            .foreign_keys
            .iter()
            .find(|fk| {
                fk.table_name == table
                    && fk.column_names == columns
                    && fk.references_table_name == references_table
            })
            .map(|fk| fk.name.clone());
        self.execute(Command::RemoveForeignKey {
            table: table.to_string(),
            columns: columns.to_vec(),
            references_table: references_table.to_string(),
            references_columns: references_columns.to_vec(),
            name,
        })
    }

    fn foreign_keys(&self, table: &str) -> SchemaPlusResult<Vec<ForeignKeyDefinition>> {
        Ok(self.catalog.foreign_keys(table))
    }

    fn reverting_log(&mut self) -> Option<&mut CommandLog> {
        if self.reverting {
            Some(&mut self.log)
        } else {
            None
        }
    }
}
