//! Foreign key definitions and constraint/index naming.

use serde::{Deserialize, Serialize};

use schemaplus_core::ReferenceAction;

use crate::options::Deferrable;

/// Replaces the schema separator in a qualified table name.
fn fixup_schema_name(table: &str) -> String {
    table.replace('.', "_")
}

/// Name of the index created implicitly alongside a foreign key.
///
/// ```
/// use schemaplus_migrations::foreign_key::auto_index_name;
///
/// assert_eq!(auto_index_name("comments", "post_id"), "fk__comments_post_id");
/// assert_eq!(auto_index_name("blog.comments", "post_id"), "fk__blog_comments_post_id");
/// ```
pub fn auto_index_name(table: &str, column: &str) -> String {
    format!("fk__{}_{column}", fixup_schema_name(table))
}

/// Default name of a foreign key constraint.
pub fn default_foreign_key_name(table: &str, columns: &[String]) -> String {
    format!("fk_{}_{}", fixup_schema_name(table), columns.join("_and_"))
}

/// Default name of an explicitly requested index.
pub fn default_index_name(table: &str, columns: &[String]) -> String {
    format!("index_{}_on_{}", fixup_schema_name(table), columns.join("_and_"))
}

/// Constraint settings passed along with a foreign key's target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintOptions {
    /// Constraint name; generated when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `ON UPDATE` action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferenceAction>,
    /// `ON DELETE` action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferenceAction>,
    /// Deferrability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferrable: Option<Deferrable>,
}

/// A foreign key constraint on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    /// The constrained table.
    pub table_name: String,
    /// The constrained columns.
    pub column_names: Vec<String>,
    /// The referenced table.
    pub references_table_name: String,
    /// The referenced columns.
    pub references_column_names: Vec<String>,
    /// The constraint name.
    pub name: String,
    /// `ON UPDATE` action.
    pub on_update: Option<ReferenceAction>,
    /// `ON DELETE` action.
    pub on_delete: Option<ReferenceAction>,
    /// Deferrability.
    pub deferrable: Option<Deferrable>,
}

impl ForeignKeyDefinition {
    /// Builds a single-column foreign key definition.
    pub fn new(
        table: &str,
        column: &str,
        references_table: &str,
        references_column: &str,
        options: &ConstraintOptions,
    ) -> Self {
        let column_names = vec![column.to_string()];
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| default_foreign_key_name(table, &column_names));
        Self {
            table_name: table.to_string(),
            column_names,
            references_table_name: references_table.to_string(),
            references_column_names: vec![references_column.to_string()],
            name,
            on_update: options.on_update,
            on_delete: options.on_delete,
            deferrable: options.deferrable,
        }
    }

    /// Returns `true` if this constraint covers exactly `column` on `table`.
    pub fn matches_column(&self, table: &str, column: &str) -> bool {
        self.table_name == table && self.column_names.len() == 1 && self.column_names[0] == column
    }

    /// The constraint settings of this definition.
    pub fn constraint_options(&self) -> ConstraintOptions {
        ConstraintOptions {
            name: Some(self.name.clone()),
            on_update: self.on_update,
            on_delete: self.on_delete,
            deferrable: self.deferrable,
        }
    }
}
