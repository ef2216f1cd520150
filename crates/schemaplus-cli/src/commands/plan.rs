//! The `plan` command.
//!
//! Reads a migration script (a JSON array of steps), runs it through the
//! standard pipeline, and prints the DDL commands that would be executed.
//!
//! ```json
//! [
//!   {"op": "create_table", "table": "posts",
//!    "columns": [{"name": "title", "type": "string"}]},
//!   {"op": "add_reference", "table": "comments", "name": "post",
//!    "options": {"on_delete": "cascade"}}
//! ]
//! ```
//!
//! With `--revert` the script is applied forward against an empty schema
//! and then reverted, and only the commands of the revert are printed.

use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use schemaplus_core::{settings_loader, ForeignKeyConfig, SchemaPlusError, SchemaPlusResult, Settings};
use schemaplus_migrations::{ColumnOptions, Command, Migration};

use crate::command::ManagementCommand;

/// One step of a migration script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    AddColumn {
        table: String,
        column: String,
        #[serde(rename = "type")]
        column_type: String,
        #[serde(default)]
        options: ColumnOptions,
    },
    ChangeColumn {
        table: String,
        column: String,
        #[serde(rename = "type")]
        column_type: String,
        #[serde(default)]
        options: ColumnOptions,
    },
    RemoveColumn {
        table: String,
        column: String,
        #[serde(default, rename = "type")]
        column_type: Option<String>,
    },
    AddReference {
        table: String,
        name: String,
        #[serde(default)]
        options: ColumnOptions,
    },
    RemoveReference {
        table: String,
        name: String,
        #[serde(default)]
        options: ColumnOptions,
    },
    /// Columns are declared before references.
    CreateTable {
        table: String,
        #[serde(default)]
        columns: Vec<ColumnSpec>,
        #[serde(default)]
        references: Vec<ReferenceSpec>,
    },
    DropTable {
        table: String,
    },
}

/// A column inside a `create_table` step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default)]
    pub options: ColumnOptions,
}

/// A reference inside a `create_table` step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReferenceSpec {
    pub name: String,
    #[serde(default)]
    pub options: ColumnOptions,
}

impl ScriptStep {
    /// Performs the step on a migration.
    ///
    /// # Errors
    ///
    /// Propagates errors from the migration.
    pub fn apply(&self, migration: &mut Migration) -> SchemaPlusResult<()> {
        match self {
            Self::AddColumn {
                table,
                column,
                column_type,
                options,
            } => migration.add_column(table, column, column_type, options.clone()),
            Self::ChangeColumn {
                table,
                column,
                column_type,
                options,
            } => migration.change_column(table, column, column_type, options.clone()),
            Self::RemoveColumn {
                table,
                column,
                column_type,
            } => migration.remove_column(table, column, column_type.as_deref()),
            Self::AddReference {
                table,
                name,
                options,
            } => migration.add_reference(table, name, options.clone()),
            Self::RemoveReference {
                table,
                name,
                options,
            } => migration.remove_reference(table, name, options.clone()),
            Self::CreateTable {
                table,
                columns,
                references,
            } => migration.create_table(table, |t| {
                for column in columns {
                    t.column(&column.name, &column.column_type, column.options.clone())?;
                }
                for reference in references {
                    t.references(&reference.name, reference.options.clone())?;
                }
                Ok(())
            }),
            Self::DropTable { table } => migration.drop_table(table),
        }
    }
}

/// How the planned commands are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// The recorded commands as pretty JSON.
    #[default]
    Json,
    /// One SQL statement per line.
    Sql,
}

impl FromStr for OutputFormat {
    type Err = SchemaPlusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "sql" => Ok(Self::Sql),
            other => Err(SchemaPlusError::InvalidOption(format!(
                "unknown output format '{other}' (expected json or sql)"
            ))),
        }
    }
}

/// Parses a migration script.
///
/// # Errors
///
/// Returns [`SchemaPlusError::InvalidOption`] when the JSON is well formed
/// but a step or option is not, and [`SchemaPlusError::SerializationError`]
/// for malformed JSON.
pub fn parse_script(json: &str) -> SchemaPlusResult<Vec<ScriptStep>> {
    serde_json::from_str(json).map_err(|err| {
        if err.is_data() {
            SchemaPlusError::InvalidOption(format!("invalid migration script: {err}"))
        } else {
            SchemaPlusError::from(err)
        }
    })
}

/// Reads and parses a migration script file.
///
/// # Errors
///
/// Returns an I/O error naming the path, or any error from [`parse_script`].
pub fn load_script(path: impl AsRef<Path>) -> SchemaPlusResult<Vec<ScriptStep>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        SchemaPlusError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to read {}: {e}", path.display()),
        ))
    })?;
    parse_script(&content)
}

/// Runs the steps and returns the recorded commands.
///
/// When `revert` is set, the steps are first applied forward so the schema
/// catalog knows their indexes and foreign keys, then reverted on a fresh
/// migration starting from that catalog; only the revert is returned.
///
/// # Errors
///
/// Propagates errors from the migration, including
/// [`SchemaPlusError::IrreversibleMigration`] when reverting.
pub fn plan_script(
    steps: &[ScriptStep],
    config: ForeignKeyConfig,
    revert: bool,
) -> SchemaPlusResult<Vec<Command>> {
    let mut forward = Migration::new().with_config(config.clone());
    for step in steps {
        step.apply(&mut forward)?;
    }
    if !revert {
        return Ok(forward.into_commands());
    }

    let mut down = Migration::new()
        .with_config(config)
        .with_catalog(forward.recorder().catalog().clone());
    down.revert(|m| steps.iter().try_for_each(|step| step.apply(m)))?;
    Ok(down.into_commands())
}

/// Formats planned commands for output.
///
/// # Errors
///
/// Returns a serialization error if the commands cannot be encoded as JSON.
pub fn render_plan(commands: &[Command], format: OutputFormat) -> SchemaPlusResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(commands)?),
        OutputFormat::Sql => Ok(commands
            .iter()
            .flat_map(Command::to_sql)
            .map(|stmt| format!("{stmt};"))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Prints the DDL a migration script would execute.
pub struct PlanCommand;

impl ManagementCommand for PlanCommand {
    fn name(&self) -> &'static str {
        "plan"
    }

    fn help(&self) -> &'static str {
        "Print the DDL planned for a migration script"
    }

    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd.arg(
            clap::Arg::new("script")
                .required(true)
                .help("Path to a JSON migration script"),
        )
        .arg(
            clap::Arg::new("config")
                .long("config")
                .help("TOML settings file (environment overrides still apply)"),
        )
        .arg(
            clap::Arg::new("revert")
                .long("revert")
                .action(clap::ArgAction::SetTrue)
                .help("Print the commands that revert the script"),
        )
        .arg(
            clap::Arg::new("format")
                .long("format")
                .value_parser(["json", "sql"])
                .default_value("json")
                .help("Output format"),
        )
    }

    fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> SchemaPlusResult<()> {
        let script = matches.get_one::<String>("script").ok_or_else(|| {
            SchemaPlusError::ConfigurationError("No migration script given".to_string())
        })?;
        let loaded;
        let settings = match matches.get_one::<String>("config") {
            Some(path) => {
                loaded = settings_loader::from_toml_file_with_env(path)?;
                &loaded
            }
            None => settings,
        };
        let format: OutputFormat = matches
            .get_one::<String>("format")
            .map_or(Ok(OutputFormat::Json), |f| f.parse())?;
        let revert = matches.get_flag("revert");

        let steps = load_script(script)?;
        tracing::info!(script = %script, steps = steps.len(), revert, "planning migration script");

        let commands = plan_script(&steps, settings.foreign_keys.clone(), revert)?;
        let output = render_plan(&commands, format)?;
        writeln!(std::io::stdout().lock(), "{output}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use schemaplus_core::ReferenceAction;
    use schemaplus_migrations::IndexOptions;

    use super::*;

    fn names(commands: &[Command]) -> Vec<&'static str> {
        commands.iter().map(Command::name).collect()
    }

    // ── Parsing ──────────────────────────────────────────────────────

    #[test]
    fn test_parse_script_steps() {
        let steps = parse_script(
            r#"[
                {"op": "add_column", "table": "widgets", "column": "owner_id", "type": "integer"},
                {"op": "remove_column", "table": "widgets", "column": "legacy"},
                {"op": "add_reference", "table": "comments", "name": "post",
                 "options": {"on_delete": "cascade"}}
            ]"#,
        )
        .unwrap();

        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[1],
            ScriptStep::RemoveColumn {
                table: "widgets".into(),
                column: "legacy".into(),
                column_type: None,
            }
        );
        match &steps[2] {
            ScriptStep::AddReference { options, .. } => {
                assert_eq!(options.on_delete, Some(ReferenceAction::Cascade));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_parse_create_table() {
        let steps = parse_script(
            r#"[{"op": "create_table", "table": "comments",
                 "columns": [{"name": "body", "type": "text"}],
                 "references": [{"name": "post"}]}]"#,
        )
        .unwrap();
        match &steps[0] {
            ScriptStep::CreateTable {
                columns, references, ..
            } => {
                assert_eq!(columns[0].column_type, "text");
                assert_eq!(references[0].name, "post");
                assert_eq!(references[0].options, ColumnOptions::default());
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_op_is_invalid_option() {
        let err = parse_script(r#"[{"op": "rename_table", "table": "a"}]"#).unwrap_err();
        assert!(matches!(err, SchemaPlusError::InvalidOption(_)));
    }

    #[test]
    fn test_parse_bad_action_is_invalid_option() {
        let err = parse_script(
            r#"[{"op": "add_reference", "table": "comments", "name": "post",
                 "options": {"on_delete": "explode"}}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaPlusError::InvalidOption(_)));
    }

    #[test]
    fn test_parse_malformed_json() {
        let err = parse_script("[{").unwrap_err();
        assert!(matches!(err, SchemaPlusError::SerializationError(_)));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("sql".parse::<OutputFormat>().unwrap(), OutputFormat::Sql);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    // ── Planning ─────────────────────────────────────────────────────

    #[test]
    fn test_plan_reference() {
        let steps = parse_script(r#"[{"op": "add_reference", "table": "comments", "name": "post"}]"#)
            .unwrap();
        let commands = plan_script(&steps, ForeignKeyConfig::default(), false).unwrap();
        assert_eq!(
            names(&commands),
            vec!["add_reference", "add_index", "add_foreign_key"]
        );
        assert_eq!(
            commands[1],
            Command::AddIndex {
                table: "comments".into(),
                column: "post_id".into(),
                options: IndexOptions::named("fk__comments_post_id"),
            }
        );
    }

    #[test]
    fn test_plan_respects_config() {
        let steps = parse_script(r#"[{"op": "add_reference", "table": "comments", "name": "post"}]"#)
            .unwrap();
        let config = ForeignKeyConfig {
            auto_create: false,
            ..ForeignKeyConfig::default()
        };
        let commands = plan_script(&steps, config, false).unwrap();
        assert_eq!(names(&commands), vec!["add_reference"]);
    }

    #[test]
    fn test_plan_revert() {
        let steps = parse_script(
            r#"[
                {"op": "create_table", "table": "posts", "columns": [{"name": "title", "type": "string"}]},
                {"op": "add_reference", "table": "comments", "name": "post"}
            ]"#,
        )
        .unwrap();
        let commands = plan_script(&steps, ForeignKeyConfig::default(), true).unwrap();
        assert_eq!(
            names(&commands),
            vec!["remove_foreign_key", "remove_index", "remove_reference", "drop_table"]
        );
    }

    #[test]
    fn test_plan_revert_irreversible() {
        let steps = parse_script(
            r#"[{"op": "change_column", "table": "widgets", "column": "owner_id", "type": "bigint"}]"#,
        )
        .unwrap();
        let err = plan_script(&steps, ForeignKeyConfig::default(), true).unwrap_err();
        assert!(matches!(err, SchemaPlusError::IrreversibleMigration(_)));
    }

    // ── Rendering ────────────────────────────────────────────────────

    #[test]
    fn test_render_sql() {
        let steps = parse_script(r#"[{"op": "add_reference", "table": "comments", "name": "post"}]"#)
            .unwrap();
        let commands = plan_script(&steps, ForeignKeyConfig::default(), false).unwrap();
        let sql = render_plan(&commands, OutputFormat::Sql).unwrap();
        let lines: Vec<&str> = sql.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "ALTER TABLE \"comments\" ADD COLUMN \"post_id\" BIGINT;");
        assert_eq!(
            lines[1],
            "CREATE INDEX \"fk__comments_post_id\" ON \"comments\" (\"post_id\");"
        );
        assert!(lines[2].starts_with("ALTER TABLE \"comments\" ADD CONSTRAINT"));
    }

    #[test]
    fn test_render_json() {
        let steps = parse_script(r#"[{"op": "drop_table", "table": "widgets"}]"#).unwrap();
        let commands = plan_script(&steps, ForeignKeyConfig::default(), false).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&render_plan(&commands, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json[0]["command"], "drop_table");
    }

    // ── Command ──────────────────────────────────────────────────────

    #[test]
    fn test_command_metadata() {
        assert_eq!(PlanCommand.name(), "plan");
        assert_eq!(PlanCommand.help(), "Print the DDL planned for a migration script");
    }

    #[test]
    fn test_handle_with_script_file() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("migration.json");
        std::fs::write(
            &script,
            r#"[{"op": "add_reference", "table": "comments", "name": "post"}]"#,
        )
        .unwrap();

        let cli = clap::Command::new("test")
            .subcommand(PlanCommand.add_arguments(clap::Command::new("plan")));
        let matches = cli
            .try_get_matches_from(["test", "plan", script.to_str().unwrap(), "--format", "sql"])
            .unwrap();
        let (_, sub_matches) = matches.subcommand().unwrap();

        assert!(PlanCommand.handle(sub_matches, &Settings::default()).is_ok());
    }

    #[test]
    fn test_handle_missing_script_file() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("missing.json");

        let cli = clap::Command::new("test")
            .subcommand(PlanCommand.add_arguments(clap::Command::new("plan")));
        let matches = cli
            .try_get_matches_from(["test", "plan", script.to_str().unwrap()])
            .unwrap();
        let (_, sub_matches) = matches.subcommand().unwrap();

        let err = PlanCommand
            .handle(sub_matches, &Settings::default())
            .unwrap_err();
        assert!(matches!(err, SchemaPlusError::IoError(_)));
    }

    #[test]
    fn test_rejects_unknown_format() {
        let cli = clap::Command::new("test")
            .subcommand(PlanCommand.add_arguments(clap::Command::new("plan")));
        assert!(cli
            .try_get_matches_from(["test", "plan", "x.json", "--format", "yaml"])
            .is_err());
    }
}
