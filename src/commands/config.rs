use crate::cli::{Cli, ConfigAction};
use crate::config::Config;
use anyhow::{Context, Result};

pub fn handle_config_action(action: ConfigAction, cli: &Cli) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            let path = match cli.config.first() {
                Some(path) => path.clone(),
                None => Config::default_path()?,
            };
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::write_sample(&path)?;

            if cli.json {
                let status = serde_json::json!({
                    "status": "success",
                    "path": path.display().to_string(),
                });
                println!("{status}");
            } else {
                println!("Configuration initialized at: {}", path.display());
            }
        }
        ConfigAction::Show => {
            let config = super::load_config(cli)?.redacted();
            if cli.json {
                let json = serde_json::to_string_pretty(&config)
                    .context("Failed to serialize config to JSON")?;
                println!("{json}");
            } else {
                let toml_str =
                    toml::to_string_pretty(&config).context("Failed to serialize config")?;
                println!("{toml_str}");
            }
        }
    }
    Ok(())
}
