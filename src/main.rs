// freshness-monitor: alert when monitored data sources stop updating
//
// Meant to be invoked periodically by an external scheduler (cron).
use clap::Parser;
use freshness_monitor::cli::{Cli, Commands};
use freshness_monitor::commands::{
    handle_config_action, handle_list_command, handle_run_command, handle_test_alert_command,
    load_config,
};
use freshness_monitor::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command.clone().unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = load_config(&cli)?;
            let report = handle_run_command(&config, cli.dry_run, cli.json).await?;
            if report.has_errors() {
                tracing::error!("one or more checks failed");
            }
            std::process::exit(report.exit_code());
        }
        Commands::List => {
            let config = load_config(&cli)?;
            handle_list_command(&config, cli.json)?;
        }
        Commands::TestAlert => {
            let config = load_config(&cli)?;
            handle_test_alert_command(&config, cli.dry_run)?;
        }
        Commands::Config { action } => {
            handle_config_action(action, &cli)?;
        }
    }
    Ok(())
}
