//! # schemaplus-migrations
//!
//! Migration middleware for schemaplus. Intercepts column definitions made
//! while a schema is built or altered, infers foreign key constraints and
//! their supporting indexes, and records the resulting DDL.
//!
//! ## Architecture
//!
//! - A [`ColumnEvent`] describes one column being added, changed, or removed.
//! - A [`Pipeline`] runs [`Middleware`] around the column definition itself
//!   in onion order.
//! - [`Shortcuts`] folds top-level `references`/`on_update`/`on_delete`/
//!   `deferrable` into the `foreign_key` option.
//! - [`AddForeignKeys`] infers the foreign key and emits index and
//!   constraint through a [`Caller`]: either a [`TableDefinition`] or a live
//!   table sink implementing [`SchemaStatements`].
//! - [`CommandRecorder`] records every DDL command; while reverting, the
//!   planner strips its own additive side effects from the log.
//! - [`Migration`] ties it together and supports `revert`.
//!
//! ## Module Overview
//!
//! - [`options`] - typed column options
//! - [`event`] - `ColumnEvent`, `Operation`, `ColumnKind`
//! - [`pipeline`] - `Middleware` trait and `Pipeline`
//! - [`shortcuts`] - option normalizer
//! - [`inference`] - pure foreign key inference and table naming
//! - [`foreign_keys`] - the foreign key and index planner
//! - [`caller`] - DDL sinks
//! - [`table_definition`] - in-progress `CREATE TABLE`
//! - [`recorder`] - recording live-table sink
//! - [`commands`] - recorded commands, inverses, and the command log
//! - [`foreign_key`] - foreign key definitions and naming
//! - [`migration`] - the migration runner
//! - [`sql`] - SQL rendering

// Clippy overrides appropriate for a DDL generation / migration crate.
#![allow(clippy::too_many_lines)]
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod caller;
pub mod commands;
pub mod event;
pub mod foreign_key;
pub mod foreign_keys;
pub mod inference;
pub mod migration;
pub mod options;
pub mod pipeline;
pub mod recorder;
pub mod shortcuts;
pub mod sql;
pub mod table_definition;

// Re-export key types at the crate root.
pub use caller::{Caller, IndexRemoval, SchemaStatements};
pub use commands::{strip_additive, Command, CommandLog};
pub use event::{ColumnEvent, ColumnKind, Operation};
pub use foreign_key::{auto_index_name, ConstraintOptions, ForeignKeyDefinition};
pub use foreign_keys::AddForeignKeys;
pub use inference::{infer_foreign_key, Inference, Pluralized, TableNaming, Verbatim};
pub use migration::{Migration, Table, TableBuilder};
pub use options::{
    ColumnOptions, Deferrable, ForeignKeyOption, ForeignKeyOptions, IndexOption, IndexOptions,
    References,
};
pub use pipeline::{Middleware, Pipeline, PostProcess};
pub use recorder::{CommandRecorder, SchemaCatalog};
pub use shortcuts::{normalize_foreign_key_options, Shortcuts};
pub use table_definition::TableDefinition;
