//! # schemaplus-cli
//!
//! The `schemaplus` command-line tool.
//!
//! - **Command framework** - [`ManagementCommand`] and [`CommandRegistry`]
//! - **`plan`** - runs a JSON migration script through the foreign key
//!   pipeline and prints the resulting commands as JSON or SQL
//!
//! ## Quick Start
//!
//! ```rust
//! use schemaplus_cli::command::CommandRegistry;
//! use schemaplus_cli::commands::register_builtin_commands;
//!
//! let mut registry = CommandRegistry::new();
//! register_builtin_commands(&mut registry);
//!
//! assert_eq!(registry.list_commands(), vec!["plan"]);
//! ```

// These clippy lints are intentionally allowed:
// - result_large_err: SchemaPlusError is the workspace-wide error type
// - doc_markdown: backtick requirements for documentation items are too strict
// - module_name_repetitions: re-exports make module-prefixed names redundant
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod command;
pub mod commands;

pub use command::{CommandRegistry, ManagementCommand};
pub use commands::register_builtin_commands;
