//! Integration tests for the migration middleware.
//!
//! These tests drive whole migrations through the public API and verify:
//! - Foreign keys and auto-indexes inferred from the `_id` convention
//! - Explicit opt-outs (`foreign_key: false`, `references: null`, `index: false`)
//! - Change of an existing column replaces stale constraints
//! - Revert replay records teardown in reverse order
//! - Reverting a removal restores the column with its constraints
//! - Options parsed from JSON behave like the builder API
//! - SQL rendering of a full migration

use std::sync::Arc;

use schemaplus_core::{ForeignKeyConfig, ReferenceAction, SchemaPlusError};
use schemaplus_migrations::{
    Command, ColumnEvent, ColumnOptions, ConstraintOptions, ForeignKeyDefinition, IndexOptions,
    Middleware, Migration, Pipeline, PostProcess, SchemaCatalog, Verbatim,
};

fn migration() -> Migration {
    Migration::new().with_config(ForeignKeyConfig::default())
}

fn names(commands: &[Command]) -> Vec<&'static str> {
    commands.iter().map(Command::name).collect()
}

fn options(json: &str) -> ColumnOptions {
    serde_json::from_str(json).unwrap()
}

fn foreign_key(command: &Command) -> &ForeignKeyDefinition {
    match command {
        Command::AddForeignKey(fk) => fk,
        other => panic!("expected add_foreign_key, got {}", other.name()),
    }
}

fn post_fk() -> ForeignKeyDefinition {
    ForeignKeyDefinition::new(
        "comments",
        "post_id",
        "posts",
        "id",
        &ConstraintOptions::default(),
    )
}

// ── Inference ───────────────────────────────────────────────────────────

#[test]
fn test_reference_scenario() {
    let mut m = migration();
    m.add_reference("comments", "post", ColumnOptions::new())
        .unwrap();

    let commands = m.commands();
    assert_eq!(names(commands), vec!["add_reference", "add_index", "add_foreign_key"]);
    assert_eq!(
        commands[1],
        Command::AddIndex {
            table: "comments".into(),
            column: "post_id".into(),
            options: IndexOptions::named("fk__comments_post_id"),
        }
    );
    assert_eq!(foreign_key(&commands[2]), &post_fk());
}

#[test]
fn test_index_false_scenario() {
    let mut m = migration();
    m.add_column("widgets", "owner_id", "integer", options(r#"{"index": false}"#))
        .unwrap();

    let commands = m.commands();
    assert_eq!(names(commands), vec!["add_column", "add_foreign_key"]);
    let fk = foreign_key(&commands[1]);
    assert_eq!(fk.references_table_name, "owners");
    assert_eq!(fk.references_column_names, vec!["id"]);
}

#[test]
fn test_inferred_table_names_are_pluralized() {
    let mut m = migration();
    m.change_table("posts", |t| {
        t.column("category_id", "integer", ColumnOptions::new())?;
        t.column("person_id", "integer", ColumnOptions::new())?;
        t.column("parent_id", "integer", ColumnOptions::new())
    })
    .unwrap();

    let targets: Vec<_> = m
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::AddForeignKey(fk) => Some(fk.references_table_name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(targets, vec!["categories", "people", "posts"]);
}

#[test]
fn test_verbatim_table_names() {
    let mut m = migration().with_pipeline(Arc::new(Pipeline::with_naming(Verbatim)));
    m.add_column("posts", "category_id", "integer", ColumnOptions::new())
        .unwrap();
    assert_eq!(foreign_key(&m.commands()[2]).references_table_name, "category");
}

#[test]
fn test_plain_column_untouched() {
    let mut m = migration();
    m.add_column("widgets", "title", "string", ColumnOptions::new())
        .unwrap();
    assert_eq!(names(m.commands()), vec!["add_column"]);
}

// ── Opt-outs ────────────────────────────────────────────────────────────

#[test]
fn test_foreign_key_false_from_json() {
    let mut m = migration();
    m.add_column("comments", "post_id", "integer", options(r#"{"foreign_key": false}"#))
        .unwrap();
    assert_eq!(names(m.commands()), vec!["add_column"]);
}

#[test]
fn test_references_null_disables_from_json() {
    for json in [
        r#"{"references": null}"#,
        r#"{"foreign_key": {"references": null}}"#,
        r#"{"foreign_key": {"references": false}}"#,
    ] {
        let mut m = migration();
        m.add_column("comments", "post_id", "integer", options(json))
            .unwrap();
        assert_eq!(names(m.commands()), vec!["add_column"], "options: {json}");
    }
}

#[test]
fn test_auto_index_off_per_run() {
    let config = ForeignKeyConfig {
        auto_index: false,
        ..ForeignKeyConfig::default()
    };
    let mut m = Migration::new().with_config(config);
    m.add_reference("comments", "post", ColumnOptions::new())
        .unwrap();
    assert_eq!(names(m.commands()), vec!["add_reference", "add_foreign_key"]);
}

// ── Referential actions ─────────────────────────────────────────────────

#[test]
fn test_actions_precedence() {
    let config = ForeignKeyConfig {
        on_update: Some(ReferenceAction::Restrict),
        on_delete: Some(ReferenceAction::Restrict),
        ..ForeignKeyConfig::default()
    };
    let mut m = Migration::new().with_config(config);
    m.add_column(
        "comments",
        "author_id",
        "integer",
        options(r#"{"references": "users", "on_delete": "cascade"}"#),
    )
    .unwrap();
    m.add_column(
        "comments",
        "editor_id",
        "integer",
        options(r#"{"foreign_key": {"references": ["users", "uuid"], "on_update": "none"}, "on_update": "cascade"}"#),
    )
    .unwrap();

    let author = foreign_key(&m.commands()[2]);
    assert_eq!(author.references_table_name, "users");
    assert_eq!(author.on_update, Some(ReferenceAction::Restrict));
    assert_eq!(author.on_delete, Some(ReferenceAction::Cascade));

    let editor = foreign_key(&m.commands()[5]);
    assert_eq!(editor.references_column_names, vec!["uuid"]);
    assert_eq!(editor.on_update, Some(ReferenceAction::NoAction));
    assert_eq!(editor.on_delete, Some(ReferenceAction::Restrict));
}

// ── Change ──────────────────────────────────────────────────────────────

#[test]
fn test_change_replaces_existing_constraints() {
    let catalog = SchemaCatalog::new()
        .with_foreign_key(post_fk())
        .with_index("comments", "fk__comments_post_id");
    let mut m = migration().with_catalog(catalog);
    m.change_column(
        "comments",
        "post_id",
        "bigint",
        options(r#"{"references": "articles"}"#),
    )
    .unwrap();

    assert_eq!(
        names(m.commands()),
        vec![
            "change_column",
            "remove_foreign_key",
            "remove_index",
            "add_index",
            "add_foreign_key"
        ]
    );
    let remaining = m.recorder().catalog().foreign_keys("comments");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].references_table_name, "articles");
}

#[test]
fn test_change_twice_is_idempotent() {
    let mut m = migration();
    m.add_column("comments", "post_id", "integer", ColumnOptions::new())
        .unwrap();
    m.change_column("comments", "post_id", "bigint", ColumnOptions::new())
        .unwrap();
    m.change_column("comments", "post_id", "bigint", ColumnOptions::new())
        .unwrap();

    assert_eq!(m.recorder().catalog().foreign_keys("comments").len(), 1);
    assert!(m
        .recorder()
        .catalog()
        .has_index("comments", "fk__comments_post_id"));
}

// ── create_table ────────────────────────────────────────────────────────

#[test]
fn test_create_table_inline_constraints() {
    let mut m = migration();
    m.create_table("comments", |t| {
        t.column("body", "text", options(r#"{"null": false}"#))?;
        t.belongs_to("post", options(r#"{"on_delete": "cascade"}"#))?;
        t.references("imageable", options(r#"{"polymorphic": true, "index": true}"#))
    })
    .unwrap();

    let Command::CreateTable(definition) = &m.commands()[0] else {
        panic!("expected create_table");
    };
    let columns: Vec<_> = definition.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        columns,
        vec!["id", "body", "post_id", "imageable_type", "imageable_id"]
    );
    assert_eq!(definition.foreign_keys.len(), 1);
    assert_eq!(
        definition.foreign_keys[0].on_delete,
        Some(ReferenceAction::Cascade)
    );
    let indexes: Vec<_> = definition
        .indexes
        .iter()
        .map(|ix| ix.name("comments"))
        .collect();
    assert_eq!(
        indexes,
        vec![
            "fk__comments_post_id",
            "index_comments_on_imageable_type_and_imageable_id"
        ]
    );
}

#[test]
fn test_sink_error_propagates_unchanged() {
    let mut m = migration();
    let err = m
        .create_table("comments", |t| {
            t.column("body", "text", ColumnOptions::new())?;
            Err(SchemaPlusError::SchemaError("table \"posts\" does not exist".into()))
        })
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Schema error: table \"posts\" does not exist"
    );
}

// ── Revert ──────────────────────────────────────────────────────────────

#[test]
fn test_revert_add_reference_scenario() {
    let mut m = migration();
    m.add_reference("comments", "post", ColumnOptions::new())
        .unwrap();
    m.revert(|r| r.add_reference("comments", "post", ColumnOptions::new()))
        .unwrap();

    // The replay keeps the planner's teardown; it runs before the column drop.
    assert_eq!(
        names(&m.commands()[3..]),
        vec!["remove_foreign_key", "remove_index", "remove_reference"]
    );
    assert!(m.recorder().catalog().foreign_keys("comments").is_empty());
    assert!(!m
        .recorder()
        .catalog()
        .has_index("comments", "fk__comments_post_id"));
}

fn add_owner(m: &mut Migration) -> schemaplus_core::SchemaPlusResult<()> {
    m.change_table("widgets", |t| {
        t.column("owner_id", "integer", ColumnOptions::new())?;
        t.index("owner_id", &IndexOptions::named("by_owner"))
    })
}

#[test]
fn test_revert_of_change_table_block() {
    let mut m = migration();
    add_owner(&mut m).unwrap();
    assert_eq!(
        names(m.commands()),
        vec!["add_column", "add_index", "add_foreign_key", "add_index"]
    );

    m.revert(add_owner).unwrap();

    assert_eq!(
        names(&m.commands()[4..]),
        vec!["remove_index", "remove_foreign_key", "remove_index", "remove_column"]
    );
    assert_eq!(
        m.commands()[4],
        Command::RemoveIndex {
            table: "widgets".into(),
            name: Some("by_owner".into()),
            column: Some("owner_id".into()),
            if_exists: false,
        }
    );
    assert_eq!(
        m.commands()[7],
        Command::RemoveColumn {
            table: "widgets".into(),
            column: "owner_id".into(),
            column_type: Some("integer".into()),
            options: ColumnOptions::new(),
        }
    );
}

#[test]
fn test_revert_remove_reference_restores_constraints() {
    let mut m = migration();
    m.add_reference("comments", "post", ColumnOptions::new())
        .unwrap();
    m.remove_reference("comments", "post", ColumnOptions::new())
        .unwrap();
    assert!(m.recorder().catalog().foreign_keys("comments").is_empty());
    let start = m.commands().len();

    m.revert(|r| r.remove_reference("comments", "post", ColumnOptions::new()))
        .unwrap();

    assert_eq!(
        names(&m.commands()[start..]),
        vec!["add_reference", "add_index", "add_foreign_key"]
    );
    assert_eq!(foreign_key(&m.commands()[start + 2]), &post_fk());
    assert_eq!(m.recorder().catalog().foreign_keys("comments"), vec![post_fk()]);
    assert!(m
        .recorder()
        .catalog()
        .has_index("comments", "fk__comments_post_id"));
}

#[test]
fn test_revert_remove_column_with_type_restores_foreign_key() {
    let mut m = migration();
    m.revert(|r| r.remove_column("widgets", "owner_id", Some("integer")))
        .unwrap();

    let commands = m.commands();
    assert_eq!(names(commands), vec!["add_column", "add_index", "add_foreign_key"]);
    assert_eq!(foreign_key(&commands[2]).references_table_name, "owners");
}

#[test]
fn test_revert_of_add_then_remove_block() {
    let mut m = migration();
    m.revert(|r| {
        r.add_reference("comments", "post", ColumnOptions::new())?;
        r.remove_reference("comments", "post", ColumnOptions::new())
    })
    .unwrap();

    assert_eq!(
        names(m.commands()),
        vec![
            "add_reference",
            "add_index",
            "add_foreign_key",
            "remove_foreign_key",
            "remove_index",
            "remove_reference",
        ]
    );
    assert!(m.recorder().catalog().foreign_keys("comments").is_empty());
}

#[test]
fn test_revert_irreversible() {
    let mut m = migration();
    let err = m
        .revert(|r| r.remove_column("widgets", "title", None))
        .unwrap_err();
    assert!(matches!(err, SchemaPlusError::IrreversibleMigration(_)));
    assert!(m.commands().is_empty());
}

// ── Custom middleware ───────────────────────────────────────────────────

struct NotNullReferences;

impl Middleware for NotNullReferences {
    fn name(&self) -> &'static str {
        "not_null_references"
    }

    fn before(&self, event: &mut ColumnEvent) -> PostProcess {
        if event.is_reference() {
            event.options.null.get_or_insert(false);
        }
        PostProcess::Skip
    }
}

#[test]
fn test_custom_middleware_runs_outermost() {
    let mut pipeline = Pipeline::new();
    pipeline.add(NotNullReferences);
    pipeline.add(schemaplus_migrations::Shortcuts);
    pipeline.add(schemaplus_migrations::AddForeignKeys::default());

    let mut m = migration().with_pipeline(Arc::new(pipeline));
    m.add_reference("comments", "post", ColumnOptions::new())
        .unwrap();

    let Command::AddReference { options, .. } = &m.commands()[0] else {
        panic!("expected add_reference");
    };
    assert_eq!(options.null, Some(false));
    assert_eq!(names(m.commands()).len(), 3);
}

// ── SQL ─────────────────────────────────────────────────────────────────

#[test]
fn test_migration_sql() {
    let mut m = migration();
    m.create_table("posts", |t| t.column("title", "string", ColumnOptions::new()))
        .unwrap();
    m.add_reference("comments", "post", options(r#"{"on_delete": "cascade"}"#))
        .unwrap();

    assert_eq!(
        m.to_sql(),
        vec![
            "CREATE TABLE \"posts\" (\"id\" BIGSERIAL PRIMARY KEY, \"title\" VARCHAR(255))",
            "ALTER TABLE \"comments\" ADD COLUMN \"post_id\" BIGINT",
            "CREATE INDEX \"fk__comments_post_id\" ON \"comments\" (\"post_id\")",
            "ALTER TABLE \"comments\" ADD CONSTRAINT \"fk_comments_post_id\" FOREIGN KEY (\"post_id\") \
             REFERENCES \"posts\" (\"id\") ON DELETE CASCADE",
        ]
    );
}

#[test]
fn test_commands_serialize_to_json() {
    let mut m = migration();
    m.add_reference("comments", "post", ColumnOptions::new())
        .unwrap();
    let json = serde_json::to_value(m.commands()).unwrap();
    assert_eq!(json[0]["command"], "add_reference");
    assert_eq!(json[0]["options"]["foreign_key"], false);
    assert_eq!(json[1]["options"]["name"], "fk__comments_post_id");
    assert_eq!(json[2]["references_table_name"], "posts");
}
