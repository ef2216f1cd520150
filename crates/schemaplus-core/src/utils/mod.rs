//! Utility functions for schemaplus.
//!
//! - [`text`]: naming helpers (pluralization).

pub mod text;
