use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "freshness-monitor")]
#[command(about = "Alert when monitored data sources stop updating")]
#[command(version)]
pub struct Cli {
    /// Config file path; repeat to merge several files in order
    #[arg(short, long, global = true)]
    pub config: Vec<PathBuf>,

    /// Credentials file merged after the config files
    #[arg(short = 'p', long, global = true)]
    pub credentials: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON output format
    #[arg(long, global = true)]
    pub json: bool,

    /// Write alerts to the log instead of sending mail
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Alert recipient, replacing the configured list (repeatable)
    #[arg(long = "recipient", global = true)]
    pub recipients: Vec<String>,

    /// Override a check's path or host (NAME=VALUE, repeatable)
    #[arg(long = "location", value_parser = parse_key_val, global = true)]
    pub locations: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Config files followed by the credentials file, in merge order
    pub fn config_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.config.clone();
        if paths.is_empty() && self.credentials.is_some() {
            if let Ok(default) = crate::config::Config::default_path() {
                paths.push(default);
            }
        }
        paths.extend(self.credentials.iter().cloned());
        paths
    }
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show the merged configuration with secrets hidden
    Show,
    /// Write a commented sample configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run every enabled check once (default)
    Run,

    /// List configured checks without running them
    List,

    /// Send a test alert through the configured notification sink
    #[command(name = "test-alert")]
    TestAlert,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    if key.is_empty() || value.is_empty() {
        return Err(format!("expected NAME=VALUE, got '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::parse_from(["freshness-monitor"]);
        assert!(cli.command.is_none());
        assert!(cli.config.is_empty());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_repeated_flags() {
        let cli = Cli::parse_from([
            "freshness-monitor",
            "--config",
            "a.toml",
            "-c",
            "b.toml",
            "--credentials",
            "secret.toml",
            "--location",
            "l0-tx=/mnt/l0",
            "--recipient",
            "ops@example.org",
            "run",
        ]);
        assert_eq!(cli.command, Some(Commands::Run));
        assert_eq!(
            cli.config_paths(),
            vec![
                PathBuf::from("a.toml"),
                PathBuf::from("b.toml"),
                PathBuf::from("secret.toml")
            ]
        );
        assert_eq!(
            cli.locations,
            vec![("l0-tx".to_string(), "/mnt/l0".to_string())]
        );
        assert_eq!(cli.recipients, vec!["ops@example.org".to_string()]);
    }

    #[test]
    fn test_bad_location_rejected() {
        let result = Cli::try_parse_from(["freshness-monitor", "--location", "no-equals"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_subcommands() {
        let cli = Cli::parse_from(["freshness-monitor", "config", "init", "--force"]);
        assert_eq!(
            cli.command,
            Some(Commands::Config {
                action: ConfigAction::Init { force: true }
            })
        );
    }
}
