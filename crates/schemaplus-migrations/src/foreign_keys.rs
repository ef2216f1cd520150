//! Foreign key and index planning.
//!
//! [`AddForeignKeys`] is the innermost middleware of the standard pipeline.
//! Before the column is defined it takes index creation away from the
//! generic column path and stops reference columns from creating their own
//! constraint. Afterwards it restores the caller's original options, infers
//! the foreign key, and emits the index and constraint itself, so that an
//! implicit index is always named after the foreign key it supports.
//!
//! Polymorphic references are left entirely to the column path.
//!
//! When the caller is replaying a revert, its log holds inverses, so every
//! additive entry appended while planning undoes one of the removals made
//! here; those entries are stripped again.

use schemaplus_core::{ForeignKeyConfig, SchemaPlusResult, SETTINGS};

use crate::caller::{Caller, IndexRemoval};
use crate::event::{ColumnEvent, Operation};
use crate::foreign_key::auto_index_name;
use crate::inference::{infer_foreign_key, ForeignKeyArgs, Pluralized, TableNaming};
use crate::options::{ForeignKeyOption, IndexOptions};
use crate::pipeline::{Middleware, PostProcess};

/// Plans foreign keys and their supporting indexes.
#[derive(Debug)]
pub struct AddForeignKeys {
    naming: Box<dyn TableNaming>,
}

impl Default for AddForeignKeys {
    fn default() -> Self {
        Self::new(Pluralized)
    }
}

impl AddForeignKeys {
    /// Creates a planner with the given table naming strategy.
    pub fn new(naming: impl TableNaming + 'static) -> Self {
        Self {
            naming: Box::new(naming),
        }
    }

    fn plan(
        &self,
        event: &ColumnEvent,
        caller: &mut Caller<'_>,
        config: &ForeignKeyConfig,
    ) -> SchemaPlusResult<()> {
        let inference = infer_foreign_key(
            &event.table_name,
            &event.column_name,
            &event.options,
            config,
            self.naming.as_ref(),
        );
        tracing::debug!(?inference, "inferred foreign key");

        if event.operation == Operation::Change && inference.is_decided() {
            remove_foreign_key_if_exists(event, caller)?;
            remove_auto_index_if_exists(event, caller)?;
        }

        let args = inference.into_args();
        create_index(event, caller, args.is_some(), config)?;
        if let Some(args) = args {
            create_foreign_key(event, caller, &args)?;
        }
        Ok(())
    }
}

impl Middleware for AddForeignKeys {
    fn name(&self) -> &'static str {
        "add_foreign_keys"
    }

    fn before(&self, event: &mut ColumnEvent) -> PostProcess {
        if event.operation == Operation::Remove {
            return PostProcess::Skip;
        }
        let polymorphic = event.is_polymorphic();
        if !polymorphic {
            event.snapshot_options();
            event.options.index = None;
        }
        if event.is_reference() {
            event.options.foreign_key = Some(ForeignKeyOption::Flag(false));
        }
        if polymorphic {
            tracing::debug!("polymorphic reference; no foreign key");
            PostProcess::Skip
        } else {
            PostProcess::Run
        }
    }

    fn after(
        &self,
        event: &mut ColumnEvent,
        caller: &mut Caller<'_>,
        config: Option<&ForeignKeyConfig>,
    ) -> SchemaPlusResult<()> {
        event.restore_options();

        let marker = caller.reverting_log().map(|log| log.len());
        let config = config.unwrap_or_else(|| SETTINGS.foreign_keys());

        self.plan(event, caller, config)?;

        if let (Some(marker), Some(log)) = (marker, caller.reverting_log()) {
            let stripped = log.strip_additive_since(marker);
            tracing::debug!(stripped, "stripped additive commands from reverting log");
        }
        Ok(())
    }
}

fn remove_foreign_key_if_exists(event: &ColumnEvent, caller: &mut Caller<'_>) -> SchemaPlusResult<()> {
    let table = &event.table_name;
    let column = &event.column_name;
    match caller {
        Caller::Definition(definition) => {
            if definition.remove_foreign_key(column) {
                tracing::debug!("dropped pending foreign key");
            }
        }
        Caller::Statements(statements) => {
            let existing = statements
                .foreign_keys(table)?
                .into_iter()
                .find(|fk| fk.matches_column(table, column));
            if let Some(fk) = existing {
                tracing::debug!(name = %fk.name, "removing existing foreign key");
                statements.remove_foreign_key(
                    table,
                    &fk.column_names,
                    &fk.references_table_name,
                    &fk.references_column_names,
                )?;
            }
        }
    }
    Ok(())
}

fn remove_auto_index_if_exists(event: &ColumnEvent, caller: &mut Caller<'_>) -> SchemaPlusResult<()> {
    let name = auto_index_name(&event.table_name, &event.column_name);
    match caller {
        Caller::Definition(definition) => {
            definition.remove_index(&name);
            Ok(())
        }
        Caller::Statements(statements) => statements.remove_index(
            &event.table_name,
            &IndexRemoval {
                name: Some(name),
                column: Some(event.column_name.clone()),
                if_exists: true,
            },
        ),
    }
}

fn create_index(
    event: &ColumnEvent,
    caller: &mut Caller<'_>,
    foreign_key_planned: bool,
    config: &ForeignKeyConfig,
) -> SchemaPlusResult<()> {
    let index = match &event.options.index {
        Some(index) => index.resolve(),
        None if foreign_key_planned && config.auto_index => Some(IndexOptions::named(
            auto_index_name(&event.table_name, &event.column_name),
        )),
        None => None,
    };
    let Some(index) = index else {
        return Ok(());
    };

    tracing::debug!(index = ?index.name, "creating index");
    match caller {
        Caller::Definition(definition) => {
            definition.index(&event.column_name, index);
            Ok(())
        }
        Caller::Statements(statements) => {
            statements.add_index(&event.table_name, &event.column_name, &index)
        }
    }
}

fn create_foreign_key(
    event: &ColumnEvent,
    caller: &mut Caller<'_>,
    args: &ForeignKeyArgs,
) -> SchemaPlusResult<()> {
    let target = &args.references;
    tracing::debug!(
        references_table = %target.table,
        references_column = %target.column,
        "creating foreign key"
    );
    match caller {
        Caller::Definition(definition) => {
            definition.foreign_key(&event.column_name, &target.table, &target.column, &args.options);
            Ok(())
        }
        Caller::Statements(statements) => statements.add_foreign_key(
            &event.table_name,
            &event.column_name,
            &target.table,
            &target.column,
            &args.options,
        ),
    }
}
