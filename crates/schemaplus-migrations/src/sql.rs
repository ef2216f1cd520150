//! SQL rendering of recorded commands.
//!
//! Renders generic, PostgreSQL-flavoured DDL. Identifiers are always
//! double-quoted; schema-qualified table names (`blog.comments`) are quoted
//! per part.

use serde_json::Value;

use crate::commands::Command;
use crate::foreign_key::{default_foreign_key_name, default_index_name, ForeignKeyDefinition};
use crate::migration::PRIMARY_KEY_TYPE;
use crate::options::{ColumnOptions, IndexOptions};
use crate::table_definition::TableDefinition;

fn quote(identifier: &str) -> String {
    identifier
        .split('.')
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join(".")
}

fn quote_list(identifiers: &[String]) -> String {
    identifiers
        .iter()
        .map(|i| quote(i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Returns the SQL type for a migration column type.
fn sql_type(column_type: &str) -> String {
    match column_type {
        PRIMARY_KEY_TYPE => "BIGSERIAL PRIMARY KEY".to_string(),
        "string" => "VARCHAR(255)".to_string(),
        "text" => "TEXT".to_string(),
        "integer" => "INTEGER".to_string(),
        "bigint" => "BIGINT".to_string(),
        "float" => "DOUBLE PRECISION".to_string(),
        "decimal" => "NUMERIC".to_string(),
        "boolean" => "BOOLEAN".to_string(),
        "date" => "DATE".to_string(),
        "datetime" | "timestamp" => "TIMESTAMP".to_string(),
        "time" => "TIME".to_string(),
        "binary" => "BYTEA".to_string(),
        "json" => "JSON".to_string(),
        "jsonb" => "JSONB".to_string(),
        "uuid" => "UUID".to_string(),
        other => other.to_uppercase(),
    }
}

fn default_sql(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

fn column_sql(column_type: &str, options: &ColumnOptions) -> String {
    let mut sql = sql_type(column_type);
    if options.null == Some(false) {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &options.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(&default_sql(default));
    }
    sql
}

fn foreign_key_clause(fk: &ForeignKeyDefinition) -> String {
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote(&fk.name),
        quote_list(&fk.column_names),
        quote(&fk.references_table_name),
        quote_list(&fk.references_column_names)
    );
    if let Some(action) = fk.on_update {
        sql.push_str(" ON UPDATE ");
        sql.push_str(action.sql());
    }
    if let Some(action) = fk.on_delete {
        sql.push_str(" ON DELETE ");
        sql.push_str(action.sql());
    }
    if let Some(deferrable) = fk.deferrable.and_then(|d| d.sql()) {
        sql.push(' ');
        sql.push_str(deferrable);
    }
    sql
}

fn create_index_sql(table: &str, columns: &[String], options: &IndexOptions) -> String {
    let name = options
        .name
        .clone()
        .unwrap_or_else(|| default_index_name(table, columns));
    let unique = if options.unique { "UNIQUE " } else { "" };
    let mut sql = format!(
        "CREATE {unique}INDEX {} ON {} ({})",
        quote(&name),
        quote(table),
        quote_list(columns)
    );
    if let Some(condition) = &options.condition {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    sql
}

fn create_table_sql(definition: &TableDefinition) -> Vec<String> {
    let mut parts: Vec<String> = definition
        .columns
        .iter()
        .map(|c| format!("{} {}", quote(&c.name), column_sql(&c.column_type, &c.options)))
        .collect();
    parts.extend(definition.foreign_keys.iter().map(foreign_key_clause));

    let mut stmts = vec![format!(
        "CREATE TABLE {} ({})",
        quote(&definition.name),
        parts.join(", ")
    )];
    stmts.extend(
        definition
            .indexes
            .iter()
            .map(|ix| create_index_sql(&definition.name, &ix.columns, &ix.options)),
    );
    stmts
}

fn add_column_sql(table: &str, column: &str, column_type: &str, options: &ColumnOptions) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote(table),
        quote(column),
        column_sql(column_type, options)
    )
}

fn change_column_sql(
    table: &str,
    column: &str,
    column_type: &str,
    options: &ColumnOptions,
) -> Vec<String> {
    let prefix = format!("ALTER TABLE {} ALTER COLUMN {}", quote(table), quote(column));
    let mut stmts = vec![format!("{prefix} TYPE {}", sql_type(column_type))];
    match options.null {
        Some(false) => stmts.push(format!("{prefix} SET NOT NULL")),
        Some(true) => stmts.push(format!("{prefix} DROP NOT NULL")),
        None => {}
    }
    if let Some(default) = &options.default {
        stmts.push(format!("{prefix} SET DEFAULT {}", default_sql(default)));
    }
    stmts
}

fn drop_column_sql(table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {}", quote(table), quote(column))
}

impl Command {
    /// Renders the command as SQL statements.
    ///
    /// # Examples
    ///
    /// ```
    /// use schemaplus_migrations::commands::Command;
    ///
    /// let drop = Command::DropTable { table: "blog.posts".into() };
    /// assert_eq!(drop.to_sql(), vec!["DROP TABLE \"blog\".\"posts\""]);
    /// ```
    pub fn to_sql(&self) -> Vec<String> {
        match self {
            Self::CreateTable(definition) => create_table_sql(definition),
            Self::DropTable { table } => vec![format!("DROP TABLE {}", quote(table))],
            Self::AddColumn {
                table,
                column,
                column_type,
                options,
            } => vec![add_column_sql(table, column, column_type, options)],
            Self::ChangeColumn {
                table,
                column,
                column_type,
                options,
            } => change_column_sql(table, column, column_type, options),
            Self::RemoveColumn { table, column, .. } => vec![drop_column_sql(table, column)],
            Self::AddReference {
                table,
                name,
                options,
            } => {
                let id_column = format!("{name}_id");
                if !options.polymorphic {
                    return vec![add_column_sql(table, &id_column, "bigint", options)];
                }
                let type_column = format!("{name}_type");
                let mut stmts = vec![
                    add_column_sql(table, &type_column, "string", &ColumnOptions::default()),
                    add_column_sql(table, &id_column, "bigint", options),
                ];
                if let Some(index) = options.index.as_ref().and_then(|ix| ix.resolve()) {
                    stmts.push(create_index_sql(table, &[type_column, id_column], &index));
                }
                stmts
            }
            Self::RemoveReference {
                table,
                name,
                options,
            } => {
                let mut stmts = vec![drop_column_sql(table, &format!("{name}_id"))];
                if options.polymorphic {
                    stmts.push(drop_column_sql(table, &format!("{name}_type")));
                }
                stmts
            }
            Self::AddIndex {
                table,
                column,
                options,
            } => vec![create_index_sql(table, &[column.clone()], options)],
            Self::RemoveIndex {
                table,
                name,
                column,
                if_exists,
            } => {
                let name = match (name, column) {
                    (Some(name), _) => name.clone(),
                    (None, Some(column)) => default_index_name(table, &[column.clone()]),
                    (None, None) => return Vec::new(),
                };
                let if_exists = if *if_exists { "IF EXISTS " } else { "" };
                vec![format!("DROP INDEX {if_exists}{}", quote(&name))]
            }
            Self::AddForeignKey(fk) => vec![format!(
                "ALTER TABLE {} ADD {}",
                quote(&fk.table_name),
                foreign_key_clause(fk)
            )],
            Self::RemoveForeignKey {
                table,
                columns,
                name,
                ..
            } => {
                let name = name
                    .clone()
                    .unwrap_or_else(|| default_foreign_key_name(table, columns));
                vec![format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    quote(table),
                    quote(&name)
                )]
            }
        }
    }
}
