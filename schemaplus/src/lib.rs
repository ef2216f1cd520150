//! # schemaplus
//!
//! Foreign key and index planning for schema migrations.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on
//! `schemaplus` for everything, or on the individual crates for finer
//! control.
//!
//! ```
//! use schemaplus::core::ForeignKeyConfig;
//! use schemaplus::migrations::{ColumnOptions, Migration};
//!
//! let mut migration = Migration::new().with_config(ForeignKeyConfig::default());
//! migration
//!     .add_reference("comments", "post", ColumnOptions::new())
//!     .unwrap();
//! assert_eq!(migration.commands().len(), 3);
//! ```

/// Settings, error types, logging, and naming helpers.
pub use schemaplus_core as core;

/// Column events, the middleware pipeline, the foreign key planner, and the
/// migration runner.
pub use schemaplus_migrations as migrations;

/// The `schemaplus` command-line tool.
#[cfg(feature = "cli")]
pub use schemaplus_cli as cli;

/// Re-exported for building option values inline.
pub use serde_json;
/// Re-exported so applications can install subscribers for schemaplus spans.
pub use tracing;
