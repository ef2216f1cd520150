//! # schemaplus-core
//!
//! Core types, settings, and error types for schemaplus. This crate has no
//! schemaplus dependencies and provides the foundation for the other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Process-wide settings and foreign key configuration
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`utils`] - Naming helpers

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;

// Re-export the most commonly used types at the crate root.
pub use error::{SchemaPlusError, SchemaPlusResult};
pub use settings::{ConfigOverrides, ForeignKeyConfig, ReferenceAction, Settings, SETTINGS};
