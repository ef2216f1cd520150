//! Command framework for the schemaplus CLI.
//!
//! A [`ManagementCommand`] declares its clap arguments and a handler;
//! a [`CommandRegistry`] collects commands, builds the top-level clap
//! application, and dispatches parsed arguments to the matching handler.
//!
//! ## Defining a Custom Command
//!
//! ```rust,no_run
//! use schemaplus_cli::command::ManagementCommand;
//! use schemaplus_core::{SchemaPlusResult, Settings};
//!
//! struct ShowConfigCommand;
//!
//! impl ManagementCommand for ShowConfigCommand {
//!     fn name(&self) -> &str { "showconfig" }
//!     fn help(&self) -> &str { "Print the effective foreign key configuration" }
//!
//!     fn handle(&self, _matches: &clap::ArgMatches, settings: &Settings) -> SchemaPlusResult<()> {
//!         println!("{}", serde_json::to_string_pretty(&settings.foreign_keys)?);
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::HashMap;

use schemaplus_core::{SchemaPlusError, SchemaPlusResult, Settings};

/// A subcommand of the `schemaplus` executable.
pub trait ManagementCommand: Send + Sync {
    /// The subcommand name.
    fn name(&self) -> &str;

    /// One-line help text.
    fn help(&self) -> &str;

    /// Adds arguments to the subcommand. The default adds none.
    fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
        cmd
    }

    /// Runs the command.
    fn handle(&self, matches: &clap::ArgMatches, settings: &Settings) -> SchemaPlusResult<()>;
}

/// Registered commands, keyed by name.
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn ManagementCommand>>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Registers a command, replacing any command of the same name.
    pub fn register(&mut self, command: Box<dyn ManagementCommand>) {
        self.commands.insert(command.name().to_string(), command);
    }

    /// Looks up a command by name.
    pub fn get(&self, name: &str) -> Option<&dyn ManagementCommand> {
        self.commands.get(name).map(AsRef::as_ref)
    }

    /// Registered command names, sorted.
    pub fn list_commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Builds the `schemaplus` clap application with one subcommand per
    /// registered command.
    pub fn build_cli(&self) -> clap::Command {
        let mut app = clap::Command::new("schemaplus")
            .about("Plans foreign keys and indexes for schema migrations")
            .subcommand_required(true)
            .arg_required_else_help(true);

        for name in self.list_commands() {
            let Some(cmd) = self.get(name) else {
                continue;
            };
            // clap wants a `&'static str` name; commands live for the whole process.
            let static_name: &'static str = Box::leak(name.to_string().into_boxed_str());
            let subcmd = clap::Command::new(static_name).about(cmd.help().to_string());
            app = app.subcommand(cmd.add_arguments(subcmd));
        }

        app
    }

    /// Dispatches parsed arguments to the selected subcommand.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaPlusError::ConfigurationError`] when no known
    /// subcommand was selected, otherwise whatever the command returns.
    pub fn execute(&self, matches: &clap::ArgMatches, settings: &Settings) -> SchemaPlusResult<()> {
        let (name, sub_matches) = matches.subcommand().ok_or_else(|| {
            SchemaPlusError::ConfigurationError("No subcommand specified".to_string())
        })?;

        let cmd = self
            .get(name)
            .ok_or_else(|| SchemaPlusError::ConfigurationError(format!("Unknown command: {name}")))?;

        tracing::debug!(command = name, "executing command");
        cmd.handle(sub_matches, settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoCommand {
        cmd_name: String,
    }

    impl EchoCommand {
        fn new(name: &str) -> Self {
            Self {
                cmd_name: name.to_string(),
            }
        }
    }

    impl ManagementCommand for EchoCommand {
        fn name(&self) -> &str {
            &self.cmd_name
        }

        fn help(&self) -> &'static str {
            "Echoes nothing"
        }

        fn add_arguments(&self, cmd: clap::Command) -> clap::Command {
            cmd.arg(
                clap::Arg::new("verbose")
                    .long("verbose")
                    .action(clap::ArgAction::SetTrue),
            )
        }

        fn handle(&self, _matches: &clap::ArgMatches, _settings: &Settings) -> SchemaPlusResult<()> {
            Ok(())
        }
    }

    struct SinkFailure;

    impl ManagementCommand for SinkFailure {
        fn name(&self) -> &'static str {
            "fail"
        }

        fn help(&self) -> &'static str {
            "Always fails"
        }

        fn handle(&self, _matches: &clap::ArgMatches, _settings: &Settings) -> SchemaPlusResult<()> {
            Err(SchemaPlusError::SchemaError("no such table: widgets".to_string()))
        }
    }

    #[test]
    fn test_registry_new_is_empty() {
        let registry = CommandRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(EchoCommand::new("echo")));
        assert_eq!(registry.len(), 1);

        let cmd = registry.get("echo").unwrap();
        assert_eq!(cmd.name(), "echo");
        assert_eq!(cmd.help(), "Echoes nothing");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_list_commands_sorted_and_replaced() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(EchoCommand::new("zebra")));
        registry.register(Box::new(EchoCommand::new("alpha")));
        registry.register(Box::new(EchoCommand::new("alpha")));
        assert_eq!(registry.list_commands(), vec!["alpha", "zebra"]);
    }

    #[test]
    fn test_build_cli_parses_subcommand_arguments() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(EchoCommand::new("echo")));

        let matches = registry
            .build_cli()
            .try_get_matches_from(["schemaplus", "echo", "--verbose"])
            .unwrap();
        let (name, sub_matches) = matches.subcommand().unwrap();
        assert_eq!(name, "echo");
        assert!(sub_matches.get_flag("verbose"));
    }

    #[test]
    fn test_build_cli_requires_subcommand() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(EchoCommand::new("echo")));
        assert!(registry
            .build_cli()
            .try_get_matches_from(["schemaplus"])
            .is_err());
    }

    #[test]
    fn test_execute_dispatches() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(EchoCommand::new("echo")));
        registry.register(Box::new(SinkFailure));

        let settings = Settings::default();
        let ok = registry
            .build_cli()
            .try_get_matches_from(["schemaplus", "echo"])
            .unwrap();
        assert!(registry.execute(&ok, &settings).is_ok());

        let failing = registry
            .build_cli()
            .try_get_matches_from(["schemaplus", "fail"])
            .unwrap();
        let err = registry.execute(&failing, &settings).unwrap_err();
        assert!(err.is_sink_error());
    }
}
