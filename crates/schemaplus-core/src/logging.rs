//! Logging integration for schemaplus.
//!
//! Provides helpers for configuring [`tracing`]-based logging from
//! [`Settings`](crate::settings::Settings) and for creating per-column spans
//! around migration events.

use crate::settings::Settings;

/// Sets up the global tracing subscriber based on the given settings.
///
/// The filter is read from `settings.log_level` (e.g. "debug",
/// "schemaplus_migrations=trace"). In debug mode a pretty, human-readable
/// format is used; otherwise a structured JSON format is used.
///
/// Installing a subscriber twice is not an error; the second call is ignored.
pub fn setup_logging(settings: &Settings) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    if settings.debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span for a single column event.
///
/// # Examples
///
/// ```
/// use schemaplus_core::logging::column_span;
///
/// let span = column_span("comments", "post_id");
/// let _guard = span.enter();
/// tracing::debug!("planning foreign key");
/// ```
pub fn column_span(table: &str, column: &str) -> tracing::Span {
    tracing::debug_span!("column", table = table, column = column)
}
