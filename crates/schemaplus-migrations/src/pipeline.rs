//! Column middleware pipeline.
//!
//! This module provides the [`Middleware`] trait and [`Pipeline`] for
//! processing column events. Each middleware may mutate the event before the
//! column definition is performed, and emit further DDL afterwards.
//!
//! ## Execution order
//!
//! `before` hooks run in registration order (first added = outermost), then
//! the column definition itself is applied to the caller, then `after` hooks
//! run in reverse order (first added = last to post-process). A middleware
//! whose `before` returns [`PostProcess::Skip`] does not get its `after`
//! hook called.

use std::fmt;

use schemaplus_core::logging::column_span;
use schemaplus_core::{ForeignKeyConfig, SchemaPlusResult};

use crate::caller::Caller;
use crate::event::ColumnEvent;
use crate::foreign_keys::AddForeignKeys;
use crate::inference::TableNaming;
use crate::shortcuts::Shortcuts;

/// Whether a middleware wants its `after` hook called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcess {
    /// Call `after` once the column definition has been applied.
    Run,
    /// Skip `after`.
    Skip,
}

/// A middleware component wrapped around the column definition step.
///
/// # Examples
///
/// ```
/// use schemaplus_migrations::event::ColumnEvent;
/// use schemaplus_migrations::pipeline::{Middleware, PostProcess};
///
/// struct NotNullByDefault;
///
/// impl Middleware for NotNullByDefault {
///     fn name(&self) -> &'static str {
///         "not_null_by_default"
///     }
///
///     fn before(&self, event: &mut ColumnEvent) -> PostProcess {
///         event.options.null.get_or_insert(false);
///         PostProcess::Skip
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &'static str;

    /// Inspects or mutates the event before the column definition runs.
    fn before(&self, event: &mut ColumnEvent) -> PostProcess;

    /// Runs after the column definition has been applied.
    ///
    /// `config` is the per-run foreign key configuration, if the migration
    /// was given one.
    ///
    /// # Errors
    ///
    /// Errors returned by the caller are propagated unchanged.
    fn after(
        &self,
        _event: &mut ColumnEvent,
        _caller: &mut Caller<'_>,
        _config: Option<&ForeignKeyConfig>,
    ) -> SchemaPlusResult<()> {
        Ok(())
    }
}

/// An ordered chain of column middleware.
pub struct Pipeline {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    /// Creates an empty pipeline that only applies column definitions.
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    /// Creates the standard pipeline: option shortcuts outermost, the foreign
    /// key planner innermost, with pluralized table names.
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline.add(Shortcuts);
        pipeline.add(AddForeignKeys::default());
        pipeline
    }

    /// Creates the standard pipeline with a custom table naming strategy.
    pub fn with_naming(naming: impl TableNaming + 'static) -> Self {
        let mut pipeline = Self::new();
        pipeline.add(Shortcuts);
        pipeline.add(AddForeignKeys::new(naming));
        pipeline
    }

    /// Adds a middleware to the inside of the pipeline.
    pub fn add(&mut self, middleware: impl Middleware + 'static) {
        self.middlewares.push(Box::new(middleware));
    }

    /// Returns the number of middleware components in the pipeline.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if the pipeline has no middleware components.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs a column event through the pipeline.
    ///
    /// 1. Calls `before` on each middleware in order, remembering which ones
    ///    asked for post-processing.
    /// 2. Applies the column definition to `caller`.
    /// 3. Calls `after` in reverse order on the middleware that asked for it.
    ///
    /// # Errors
    ///
    /// The first error returned by the caller stops the run and is returned
    /// unchanged.
    pub fn run(
        &self,
        event: &mut ColumnEvent,
        caller: &mut Caller<'_>,
        config: Option<&ForeignKeyConfig>,
    ) -> SchemaPlusResult<()> {
        let span = column_span(&event.table_name, &event.column_name);
        let _guard = span.enter();

        let mut post_process = Vec::with_capacity(self.middlewares.len());
        for middleware in &self.middlewares {
            tracing::trace!(middleware = middleware.name(), "before");
            post_process.push(middleware.before(event));
        }

        caller.apply_column(event)?;

        for (middleware, wanted) in self.middlewares.iter().zip(post_process).rev() {
            if wanted == PostProcess::Skip {
                tracing::trace!(middleware = middleware.name(), "after skipped");
                continue;
            }
            tracing::trace!(middleware = middleware.name(), "after");
            middleware.after(event, caller, config)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.middlewares.iter().map(|m| m.name()))
            .finish()
    }
}
