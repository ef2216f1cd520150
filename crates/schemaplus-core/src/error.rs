//! Core error types for schemaplus.
//!
//! This module provides the error enum [`SchemaPlusError`] shared by every
//! crate in the workspace. The foreign key planner itself raises no errors of
//! its own; most variants originate in configuration loading or in the DDL
//! sinks that the planner drives.

use thiserror::Error;

/// The primary error type for schemaplus.
///
/// Errors produced by a DDL sink (unknown table, missing column) are
/// propagated through the migration pipeline unmodified.
#[derive(Error, Debug)]
pub enum SchemaPlusError {
    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The library is improperly configured (e.g. settings configured twice).
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Schema ───────────────────────────────────────────────────────

    /// A DDL sink rejected an operation (unknown table, missing column, ...).
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A recorded command has no inverse and cannot be reverted.
    #[error("Irreversible migration: {0}")]
    IrreversibleMigration(String),

    /// A column option carries a value that cannot be interpreted.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    // ── Serialization ────────────────────────────────────────────────

    /// An error occurred during serialization or deserialization.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SchemaPlusError {
    /// Returns `true` if this error was raised by a DDL sink.
    pub const fn is_sink_error(&self) -> bool {
        matches!(self, Self::SchemaError(_))
    }
}

impl From<serde_json::Error> for SchemaPlusError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// A convenience type alias for `Result<T, SchemaPlusError>`.
pub type SchemaPlusResult<T> = Result<T, SchemaPlusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchemaPlusError::SchemaError("table \"posts\" does not exist".into());
        assert_eq!(
            err.to_string(),
            "Schema error: table \"posts\" does not exist"
        );
    }

    #[test]
    fn test_is_sink_error() {
        assert!(SchemaPlusError::SchemaError("x".into()).is_sink_error());
        assert!(!SchemaPlusError::ConfigurationError("x".into()).is_sink_error());
        assert!(!SchemaPlusError::IrreversibleMigration("x".into()).is_sink_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: SchemaPlusError = io_err.into();
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SchemaPlusError = json_err.into();
        assert!(matches!(err, SchemaPlusError::SerializationError(_)));
    }
}
