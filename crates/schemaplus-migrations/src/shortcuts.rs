//! Foreign key option shortcuts.
//!
//! Migrations may write `references`, `on_update`, `on_delete`, and
//! `deferrable` at the top level of the column options instead of inside
//! `foreign_key`. [`Shortcuts`] folds them into the `foreign_key` map before
//! anything else sees the event.

use crate::event::ColumnEvent;
use crate::options::{ColumnOptions, ForeignKeyOption, ForeignKeyOptions};
use crate::pipeline::{Middleware, PostProcess};

/// Folds shortcut keys into `options.foreign_key`.
///
/// - `foreign_key: false` is left alone; shortcuts are ignored.
/// - `foreign_key: true` becomes an empty map.
/// - Shortcut keys fill in fields the `foreign_key` map does not already set.
/// - A map whose `references` is explicitly empty becomes `false`.
///
/// ```
/// use schemaplus_migrations::options::{ColumnOptions, ForeignKeyOption, References};
/// use schemaplus_migrations::shortcuts::normalize_foreign_key_options;
///
/// let mut options = ColumnOptions::new().references(References::Disabled);
/// normalize_foreign_key_options(&mut options);
/// assert_eq!(options.foreign_key, Some(ForeignKeyOption::Flag(false)));
/// ```
pub fn normalize_foreign_key_options(options: &mut ColumnOptions) {
    let mut fk = match options.foreign_key.take() {
        Some(ForeignKeyOption::Flag(false)) => {
            options.foreign_key = Some(ForeignKeyOption::Flag(false));
            return;
        }
        Some(ForeignKeyOption::Flag(true)) => Some(ForeignKeyOptions::default()),
        Some(ForeignKeyOption::Options(fk)) => Some(fk),
        None => None,
    };

    if let Some(references) = &options.references {
        let fk = fk.get_or_insert_with(ForeignKeyOptions::default);
        fk.references.get_or_insert_with(|| references.clone());
    }
    if let Some(action) = options.on_update {
        fk.get_or_insert_with(ForeignKeyOptions::default)
            .on_update
            .get_or_insert(action);
    }
    if let Some(action) = options.on_delete {
        fk.get_or_insert_with(ForeignKeyOptions::default)
            .on_delete
            .get_or_insert(action);
    }
    if let Some(deferrable) = options.deferrable {
        fk.get_or_insert_with(ForeignKeyOptions::default)
            .deferrable
            .get_or_insert(deferrable);
    }

    options.foreign_key = fk.map(|fk| {
        if fk.references.as_ref().is_some_and(|r| r.is_disabled()) {
            ForeignKeyOption::Flag(false)
        } else {
            ForeignKeyOption::Options(fk)
        }
    });
}

/// The outermost middleware: normalizes foreign key shortcuts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Shortcuts;

impl Middleware for Shortcuts {
    fn name(&self) -> &'static str {
        "shortcuts"
    }

    fn before(&self, event: &mut ColumnEvent) -> PostProcess {
        normalize_foreign_key_options(&mut event.options);
        PostProcess::Skip
    }
}
