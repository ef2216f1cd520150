//! Built-in commands of the `schemaplus` executable.
//!
//! Each command implements
//! [`ManagementCommand`](crate::command::ManagementCommand).

pub mod plan;

pub use plan::{OutputFormat, PlanCommand, ScriptStep};

use crate::command::CommandRegistry;

/// Registers the built-in commands into the given registry.
pub fn register_builtin_commands(registry: &mut CommandRegistry) {
    registry.register(Box::new(PlanCommand));
}
