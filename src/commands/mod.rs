// Command handlers module
pub mod config;
pub mod list;
pub mod run;
pub mod test_alert;

// Re-export command handlers for easy access
pub use config::handle_config_action;
pub use list::handle_list_command;
pub use run::handle_run_command;
pub use test_alert::handle_test_alert_command;

use crate::cli::Cli;
use crate::config::Config;
use anyhow::Result;

/// Load every config source named on the command line and apply the
/// command-line overrides on top.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(&cli.config_paths())?;
    if !cli.recipients.is_empty() {
        config.notification.recipients = cli.recipients.clone();
    }
    config.apply_locations(&cli.locations)?;
    config.validate()?;
    Ok(config)
}
