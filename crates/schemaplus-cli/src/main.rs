use schemaplus_cli::{register_builtin_commands, CommandRegistry};
use schemaplus_core::logging::setup_logging;
use schemaplus_core::settings_loader;

fn main() -> anyhow::Result<()> {
    let mut registry = CommandRegistry::new();
    register_builtin_commands(&mut registry);
    let matches = registry.build_cli().get_matches();

    let settings = settings_loader::from_env()?;
    setup_logging(&settings);

    if let Err(err) = registry.execute(&matches, &settings) {
        tracing::error!(error = %err, "command failed");
        return Err(err.into());
    }
    Ok(())
}
