//! In-progress `CREATE TABLE` definitions.
//!
//! A [`TableDefinition`] collects the columns, indexes, and foreign keys of a
//! table being created. The whole definition is recorded as a single
//! [`Command::CreateTable`](crate::commands::Command::CreateTable) once the
//! table block finishes.

use serde::Serialize;

use schemaplus_core::{SchemaPlusError, SchemaPlusResult};

use crate::event::{ColumnEvent, ColumnKind, Operation};
use crate::foreign_key::{default_index_name, ConstraintOptions, ForeignKeyDefinition};
use crate::options::{ColumnOptions, IndexOptions};

/// A column inside a table definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDefinition {
    /// The column name.
    pub name: String,
    /// The column type.
    pub column_type: String,
    /// The column options as seen by the definition.
    pub options: ColumnOptions,
}

/// An index inside a table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDefinition {
    /// The indexed columns.
    pub columns: Vec<String>,
    /// Index settings.
    pub options: IndexOptions,
}

impl IndexDefinition {
    /// The index name, falling back to the conventional default.
    pub fn name(&self, table: &str) -> String {
        self.options
            .name
            .clone()
            .unwrap_or_else(|| default_index_name(table, &self.columns))
    }
}

/// A table being built by `create_table`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableDefinition {
    /// The table name.
    pub name: String,
    /// Columns in definition order.
    pub columns: Vec<ColumnDefinition>,
    /// Indexes created with the table.
    pub indexes: Vec<IndexDefinition>,
    /// Foreign key constraints created with the table.
    pub foreign_keys: Vec<ForeignKeyDefinition>,
}

impl TableDefinition {
    /// Creates an empty definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a plain column.
    pub fn column(
        &mut self,
        name: impl Into<String>,
        column_type: impl Into<String>,
        options: ColumnOptions,
    ) {
        self.columns.push(ColumnDefinition {
            name: name.into(),
            column_type: column_type.into(),
            options,
        });
    }

    /// Adds an index on a single column.
    pub fn index(&mut self, column: &str, options: IndexOptions) {
        self.indexes.push(IndexDefinition {
            columns: vec![column.to_string()],
            options,
        });
    }

    /// Adds a foreign key constraint on a single column.
    pub fn foreign_key(
        &mut self,
        column: &str,
        references_table: &str,
        references_column: &str,
        options: &ConstraintOptions,
    ) {
        self.foreign_keys.push(ForeignKeyDefinition::new(
            &self.name,
            column,
            references_table,
            references_column,
            options,
        ));
    }

    /// Returns the column with the given name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Drops a pending foreign key on `column`. Returns `true` if one existed.
    pub fn remove_foreign_key(&mut self, column: &str) -> bool {
        let before = self.foreign_keys.len();
        let table = self.name.clone();
        self.foreign_keys
            .retain(|fk| !fk.matches_column(&table, column));
        before != self.foreign_keys.len()
    }

    /// Drops a pending index by name. Returns `true` if one existed.
    pub fn remove_index(&mut self, name: &str) -> bool {
        let before = self.indexes.len();
        let table = self.name.clone();
        self.indexes.retain(|ix| ix.name(&table) != name);
        before != self.indexes.len()
    }

    /// Applies a column event as the terminal step of the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaPlusError::SchemaError`] when changing or removing a
    /// column the definition does not contain.
    pub fn apply_column(&mut self, event: &ColumnEvent) -> SchemaPlusResult<()> {
        match (event.operation, event.kind) {
            (Operation::Add, ColumnKind::Column) => {
                self.column(
                    event.column_name.clone(),
                    event.column_type.clone().unwrap_or_default(),
                    event.options.clone(),
                );
            }
            (Operation::Add, ColumnKind::Reference) => self.add_reference_columns(event),
            (Operation::Change, _) => {
                let column = self
                    .columns
                    .iter_mut()
                    .find(|c| c.name == event.column_name)
                    .ok_or_else(|| missing_column(&self.name, &event.column_name))?;
                if let Some(column_type) = &event.column_type {
                    column.column_type.clone_from(column_type);
                }
                column.options = event.options.clone();
            }
            (Operation::Remove, kind) => {
                let before = self.columns.len();
                let type_column = format!("{}_type", event.reference_name());
                self.columns.retain(|c| {
                    c.name != event.column_name
                        && !(kind == ColumnKind::Reference
                            && event.options.polymorphic
                            && c.name == type_column)
                });
                if before == self.columns.len() {
                    return Err(missing_column(&self.name, &event.column_name));
                }
            }
        }
        Ok(())
    }

    fn add_reference_columns(&mut self, event: &ColumnEvent) {
        let name = event.reference_name().to_string();
        let id_type = event
            .column_type
            .clone()
            .unwrap_or_else(|| crate::event::REFERENCE_COLUMN_TYPE.to_string());

        if event.options.polymorphic {
            let type_column = format!("{name}_type");
            self.column(type_column.clone(), "string", ColumnOptions::default());
            self.column(event.column_name.clone(), id_type, event.options.clone());
            if let Some(index) = event.options.index.as_ref().and_then(|ix| ix.resolve()) {
                self.indexes.push(IndexDefinition {
                    columns: vec![type_column, event.column_name.clone()],
                    options: index,
                });
            }
        } else {
            self.column(event.column_name.clone(), id_type, event.options.clone());
        }
    }
}

fn missing_column(table: &str, column: &str) -> SchemaPlusError {
    SchemaPlusError::SchemaError(format!(
        "column \"{column}\" does not exist in table definition \"{table}\""
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::IndexOption;

    #[test]
    fn test_apply_add_column() {
        let mut def = TableDefinition::new("widgets");
        let event = ColumnEvent::add_column("widgets", "title", "string");
        def.apply_column(&event).unwrap();
        assert_eq!(def.columns.len(), 1);
        assert_eq!(def.columns[0].name, "title");
        assert_eq!(def.columns[0].column_type, "string");
    }

    #[test]
    fn test_apply_add_reference() {
        let mut def = TableDefinition::new("comments");
        def.apply_column(&ColumnEvent::add_reference("comments", "post"))
            .unwrap();
        assert_eq!(def.columns.len(), 1);
        assert_eq!(def.columns[0].name, "post_id");
        assert_eq!(def.columns[0].column_type, "bigint");
    }

    #[test]
    fn test_apply_add_polymorphic_reference_with_index() {
        let mut def = TableDefinition::new("pictures");
        let event = ColumnEvent::add_reference("pictures", "imageable")
            .with_options(ColumnOptions::new().polymorphic().index(true));
        def.apply_column(&event).unwrap();

        let names: Vec<_> = def.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["imageable_type", "imageable_id"]);
        assert_eq!(def.indexes.len(), 1);
        assert_eq!(
            def.indexes[0].name("pictures"),
            "index_pictures_on_imageable_type_and_imageable_id"
        );
    }

    #[test]
    fn test_apply_change_missing_column() {
        let mut def = TableDefinition::new("widgets");
        let event = ColumnEvent::change_column("widgets", "owner_id", "bigint");
        let err = def.apply_column(&event).unwrap_err();
        assert!(err.is_sink_error());
    }

    #[test]
    fn test_apply_change_column() {
        let mut def = TableDefinition::new("widgets");
        def.column("owner_id", "integer", ColumnOptions::default());
        let event = ColumnEvent::change_column("widgets", "owner_id", "bigint")
            .with_options(ColumnOptions::new().null(false));
        def.apply_column(&event).unwrap();
        let column = def.get_column("owner_id").unwrap();
        assert_eq!(column.column_type, "bigint");
        assert_eq!(column.options.null, Some(false));
    }

    #[test]
    fn test_remove_pending_foreign_key_and_index() {
        let mut def = TableDefinition::new("comments");
        def.foreign_key("post_id", "posts", "id", &ConstraintOptions::default());
        def.index("post_id", IndexOptions::named("fk__comments_post_id"));

        assert!(def.remove_foreign_key("post_id"));
        assert!(!def.remove_foreign_key("post_id"));
        assert!(def.remove_index("fk__comments_post_id"));
        assert!(def.foreign_keys.is_empty());
        assert!(def.indexes.is_empty());
    }

    #[test]
    fn test_index_option_kept_on_column() {
        let mut def = TableDefinition::new("widgets");
        let event = ColumnEvent::add_column("widgets", "sku", "string")
            .with_options(ColumnOptions::new().index(true));
        def.apply_column(&event).unwrap();
        assert_eq!(def.columns[0].options.index, Some(IndexOption::Flag(true)));
    }
}
