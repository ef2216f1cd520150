//! The migration runner.
//!
//! A [`Migration`] drives column events through a [`Pipeline`] against a
//! [`CommandRecorder`]. Column-level operations (`add_column`,
//! `add_reference`, ...) run against the recorder directly, while
//! [`create_table`](Migration::create_table) collects columns into a
//! [`TableDefinition`] which is recorded as a single command at the end of
//! the block.
//!
//! [`revert`](Migration::revert) replays a block against a reverting
//! recorder, which records inverses, and then executes them last first.
//! Restored columns run through the pipeline again.

use std::sync::Arc;

use schemaplus_core::{ConfigOverrides, ForeignKeyConfig, SchemaPlusResult, SETTINGS};

use crate::caller::{Caller, SchemaStatements};
use crate::commands::Command;
use crate::event::{ColumnEvent, ColumnKind, Operation, REFERENCE_COLUMN_TYPE};
use crate::foreign_key::ConstraintOptions;
use crate::options::{ColumnOptions, IndexOptions};
use crate::pipeline::Pipeline;
use crate::recorder::{CommandRecorder, SchemaCatalog};
use crate::table_definition::TableDefinition;

/// The column type of the implicit primary key added by `create_table`.
pub const PRIMARY_KEY_TYPE: &str = "primary_key";

/// A single migration run.
///
/// # Examples
///
/// ```
/// use schemaplus_migrations::migration::Migration;
/// use schemaplus_migrations::options::ColumnOptions;
///
/// let mut migration = Migration::new();
/// migration
///     .add_reference("comments", "post", ColumnOptions::new())
///     .unwrap();
///
/// let names: Vec<_> = migration.commands().iter().map(|c| c.name()).collect();
/// assert_eq!(names, vec!["add_reference", "add_index", "add_foreign_key"]);
/// ```
#[derive(Debug)]
pub struct Migration {
    pipeline: Arc<Pipeline>,
    config: Option<ForeignKeyConfig>,
    recorder: CommandRecorder,
}

impl Default for Migration {
    fn default() -> Self {
        Self::new()
    }
}

impl Migration {
    /// Creates a migration using the standard pipeline and the process-wide
    /// foreign key configuration.
    pub fn new() -> Self {
        Self {
            pipeline: Arc::new(Pipeline::standard()),
            config: None,
            recorder: CommandRecorder::new(),
        }
    }

    /// Uses the given pipeline.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: Arc<Pipeline>) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Uses the given foreign key configuration for this run.
    #[must_use]
    pub fn with_config(mut self, config: ForeignKeyConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses the process-wide configuration with the given overrides applied.
    #[must_use]
    pub fn with_overrides(self, overrides: ConfigOverrides) -> Self {
        let config = SETTINGS.foreign_keys().merge(overrides);
        self.with_config(config)
    }

    /// Starts from a schema with known foreign keys and indexes.
    #[must_use]
    pub fn with_catalog(mut self, catalog: SchemaCatalog) -> Self {
        self.recorder = CommandRecorder::with_catalog(catalog);
        self
    }

    /// Returns the per-run configuration, if one was given.
    pub fn config(&self) -> Option<&ForeignKeyConfig> {
        self.config.as_ref()
    }

    /// Returns `true` while replaying a revert block.
    pub fn is_reverting(&self) -> bool {
        self.recorder.is_reverting()
    }

    /// Returns the recorder.
    pub fn recorder(&self) -> &CommandRecorder {
        &self.recorder
    }

    /// Returns the recorded commands.
    pub fn commands(&self) -> &[Command] {
        self.recorder.commands()
    }

    /// Consumes the migration, returning the recorded commands.
    pub fn into_commands(self) -> Vec<Command> {
        self.recorder.into_commands()
    }

    /// Renders every recorded command as SQL.
    pub fn to_sql(&self) -> Vec<String> {
        self.commands().iter().flat_map(Command::to_sql).collect()
    }

    fn run_event(&mut self, mut event: ColumnEvent) -> SchemaPlusResult<()> {
        self.pipeline.run(
            &mut event,
            &mut Caller::Statements(&mut self.recorder),
            self.config.as_ref(),
        )
    }

    // ── Column operations ────────────────────────────────────────────

    /// Adds a column to an existing table.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn add_column(
        &mut self,
        table: &str,
        column: &str,
        column_type: &str,
        options: ColumnOptions,
    ) -> SchemaPlusResult<()> {
        self.run_event(ColumnEvent::add_column(table, column, column_type).with_options(options))
    }

    /// Redefines an existing column.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn change_column(
        &mut self,
        table: &str,
        column: &str,
        column_type: &str,
        options: ColumnOptions,
    ) -> SchemaPlusResult<()> {
        self.run_event(ColumnEvent::change_column(table, column, column_type).with_options(options))
    }

    /// Drops a column. Without a type the removal cannot be reverted.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn remove_column(
        &mut self,
        table: &str,
        column: &str,
        column_type: Option<&str>,
    ) -> SchemaPlusResult<()> {
        let mut event = ColumnEvent::new(Operation::Remove, ColumnKind::Column, table, column);
        event.column_type = column_type.map(str::to_string);
        self.run_event(event)
    }

    /// Adds a `{name}_id` reference column.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn add_reference(
        &mut self,
        table: &str,
        name: &str,
        options: ColumnOptions,
    ) -> SchemaPlusResult<()> {
        self.run_event(ColumnEvent::add_reference(table, name).with_options(options))
    }

    /// Drops a reference column (and its type column when polymorphic).
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn remove_reference(
        &mut self,
        table: &str,
        name: &str,
        options: ColumnOptions,
    ) -> SchemaPlusResult<()> {
        let event = ColumnEvent::new(
            Operation::Remove,
            ColumnKind::Reference,
            table,
            format!("{name}_id"),
        )
        .with_type(REFERENCE_COLUMN_TYPE)
        .with_options(options);
        self.run_event(event)
    }

    /// Creates an index directly, bypassing the pipeline.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn add_index(
        &mut self,
        table: &str,
        column: &str,
        options: &IndexOptions,
    ) -> SchemaPlusResult<()> {
        self.recorder.add_index(table, column, options)
    }

    /// Creates a foreign key directly, bypassing the pipeline.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn add_foreign_key(
        &mut self,
        table: &str,
        column: &str,
        references_table: &str,
        references_column: &str,
        options: &ConstraintOptions,
    ) -> SchemaPlusResult<()> {
        self.recorder
            .add_foreign_key(table, column, references_table, references_column, options)
    }

    // ── Table operations ─────────────────────────────────────────────

    /// Creates a table. Columns declared in `block` run through the pipeline
    /// against the in-progress definition; an `id` primary key is added
    /// first.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `block` or the recorder; nothing is
    /// recorded in that case.
    pub fn create_table<F>(&mut self, name: &str, block: F) -> SchemaPlusResult<()>
    where
        F: FnOnce(&mut TableBuilder<'_>) -> SchemaPlusResult<()>,
    {
        let mut definition = TableDefinition::new(name);
        definition.column("id", PRIMARY_KEY_TYPE, ColumnOptions::default());

        let mut builder = TableBuilder {
            definition,
            pipeline: &self.pipeline,
            config: self.config.as_ref(),
        };
        block(&mut builder)?;
        let definition = builder.definition;

        tracing::debug!(
            table = %definition.name,
            columns = definition.columns.len(),
            foreign_keys = definition.foreign_keys.len(),
            "create_table"
        );
        self.recorder.execute(Command::CreateTable(definition))
    }

    /// Alters an existing table; each call on the [`Table`] handle is the
    /// matching column operation on this migration.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `block`.
    pub fn change_table<F>(&mut self, name: &str, block: F) -> SchemaPlusResult<()>
    where
        F: FnOnce(&mut Table<'_>) -> SchemaPlusResult<()>,
    {
        let mut table = Table {
            migration: self,
            name: name.to_string(),
        };
        block(&mut table)
    }

    /// Drops a table.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn drop_table(&mut self, name: &str) -> SchemaPlusResult<()> {
        self.recorder.execute(Command::DropTable {
            table: name.to_string(),
        })
    }

    // ── Revert ───────────────────────────────────────────────────────

    /// Undoes the operations performed by `block`.
    ///
    /// The block is replayed against a reverting recorder that starts from
    /// this migration's schema catalog and records the inverse of each
    /// command. The foreign key planner drops the additive inverses of its
    /// own removals during the replay; the recorded inverses are then
    /// executed in reverse order.
    ///
    /// # Errors
    ///
    /// Returns [`IrreversibleMigration`](schemaplus_core::SchemaPlusError::IrreversibleMigration)
    /// if any replayed command has no inverse, in which case nothing is
    /// executed, or any error raised by `block` or the recorder.
    pub fn revert<F>(&mut self, block: F) -> SchemaPlusResult<()>
    where
        F: FnOnce(&mut Self) -> SchemaPlusResult<()>,
    {
        let mut replay = Self {
            pipeline: Arc::clone(&self.pipeline),
            config: self.config.clone(),
            recorder: CommandRecorder::reverting(self.recorder.catalog().clone()),
        };
        block(&mut replay)?;

        let inverses = replay.into_commands();
        tracing::info!(commands = inverses.len(), "reverting");
        for command in inverses.into_iter().rev() {
            self.run_inverse(command)?;
        }
        Ok(())
    }

    /// Column definitions go back through the pipeline so a restored
    /// column gets its foreign key and index again.
    fn run_inverse(&mut self, command: Command) -> SchemaPlusResult<()> {
        match command {
            Command::AddColumn {
                table,
                column,
                column_type,
                options,
            } => self.run_event(
                ColumnEvent::add_column(table, column, column_type).with_options(options),
            ),
            Command::ChangeColumn {
                table,
                column,
                column_type,
                options,
            } => self.run_event(
                ColumnEvent::change_column(table, column, column_type).with_options(options),
            ),
            Command::AddReference {
                table,
                name,
                options,
            } => self.run_event(ColumnEvent::add_reference(table, &name).with_options(options)),
            other => self.recorder.execute(other),
        }
    }
}

/// Declares the columns of a table inside [`Migration::create_table`].
#[derive(Debug)]
pub struct TableBuilder<'a> {
    definition: TableDefinition,
    pipeline: &'a Pipeline,
    config: Option<&'a ForeignKeyConfig>,
}

impl TableBuilder<'_> {
    /// The table being built.
    pub fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    /// Declares a column.
    ///
    /// # Errors
    ///
    /// Propagates errors from the table definition.
    pub fn column(
        &mut self,
        name: &str,
        column_type: &str,
        options: ColumnOptions,
    ) -> SchemaPlusResult<()> {
        let event =
            ColumnEvent::add_column(&self.definition.name, name, column_type).with_options(options);
        self.run(event)
    }

    /// Declares a `{name}_id` reference column.
    ///
    /// # Errors
    ///
    /// Propagates errors from the table definition.
    pub fn references(&mut self, name: &str, options: ColumnOptions) -> SchemaPlusResult<()> {
        let event = ColumnEvent::add_reference(&self.definition.name, name).with_options(options);
        self.run(event)
    }

    /// Alias of [`references`](Self::references).
    ///
    /// # Errors
    ///
    /// Propagates errors from the table definition.
    pub fn belongs_to(&mut self, name: &str, options: ColumnOptions) -> SchemaPlusResult<()> {
        self.references(name, options)
    }

    /// Declares an index directly, bypassing the pipeline.
    pub fn index(&mut self, column: &str, options: IndexOptions) {
        self.definition.index(column, options);
    }

    fn run(&mut self, mut event: ColumnEvent) -> SchemaPlusResult<()> {
        self.pipeline.run(
            &mut event,
            &mut Caller::Definition(&mut self.definition),
            self.config,
        )
    }
}

/// An existing table being altered inside [`Migration::change_table`].
#[derive(Debug)]
pub struct Table<'a> {
    migration: &'a mut Migration,
    name: String,
}

impl Table<'_> {
    /// The table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a column.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn column(
        &mut self,
        column: &str,
        column_type: &str,
        options: ColumnOptions,
    ) -> SchemaPlusResult<()> {
        self.migration
            .add_column(&self.name, column, column_type, options)
    }

    /// Redefines a column.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn change(
        &mut self,
        column: &str,
        column_type: &str,
        options: ColumnOptions,
    ) -> SchemaPlusResult<()> {
        self.migration
            .change_column(&self.name, column, column_type, options)
    }

    /// Drops a column.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn remove(&mut self, column: &str, column_type: Option<&str>) -> SchemaPlusResult<()> {
        self.migration.remove_column(&self.name, column, column_type)
    }

    /// Adds a reference column.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn references(&mut self, name: &str, options: ColumnOptions) -> SchemaPlusResult<()> {
        self.migration.add_reference(&self.name, name, options)
    }

    /// Alias of [`references`](Self::references).
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn belongs_to(&mut self, name: &str, options: ColumnOptions) -> SchemaPlusResult<()> {
        self.references(name, options)
    }

    /// Drops a reference column.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn remove_references(
        &mut self,
        name: &str,
        options: ColumnOptions,
    ) -> SchemaPlusResult<()> {
        self.migration.remove_reference(&self.name, name, options)
    }

    /// Creates an index.
    ///
    /// # Errors
    ///
    /// Propagates errors from the recorder.
    pub fn index(&mut self, column: &str, options: &IndexOptions) -> SchemaPlusResult<()> {
        self.migration.add_index(&self.name, column, options)
    }
}
