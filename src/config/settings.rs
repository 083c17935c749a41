use crate::alerts::message::{DEFAULT_BODY, DEFAULT_SUBJECT};
use crate::alerts::notifications::parse_mailbox;
use crate::alerts::{
    AlertContext, AlertTemplate, Check, EmailSink, LogSink, NotificationSink, SmtpRelay,
    StalenessPolicy,
};
use crate::config::merge::merge_values;
use crate::sources::SourceDescriptor;
use crate::utils::{format_latest, format_std_duration};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const REDACTED: &str = "********";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Check name -> secret for remote sources without an inline `secret`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub secrets: BTreeMap<String, String>,
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Run checks concurrently, one blocking task each
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Empty means alerts are only logged
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_smtp_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub source: SourceDescriptor,
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
    /// Stop alerting once the source is older than this
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub suppress_after: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    465
}

fn default_smtp_timeout() -> Duration {
    Duration::from_secs(30)
}

impl CheckConfig {
    pub fn policy(&self) -> Result<StalenessPolicy> {
        let max_age = chrono::Duration::from_std(self.max_age)
            .with_context(|| format!("max_age of check '{}' is out of range", self.name))?;
        let suppress_after = self
            .suppress_after
            .map(chrono::Duration::from_std)
            .transpose()
            .with_context(|| format!("suppress_after of check '{}' is out of range", self.name))?;
        Ok(StalenessPolicy::new(max_age).with_suppress_after(suppress_after))
    }

    pub fn alert_template(&self) -> Result<AlertTemplate> {
        AlertTemplate::new(
            self.subject.as_deref().unwrap_or(DEFAULT_SUBJECT),
            self.body.as_deref().unwrap_or(DEFAULT_BODY),
        )
        .with_context(|| format!("Invalid alert copy for check '{}'", self.name))
    }

    /// Render the alert copy once so unknown variables fail at load time
    /// rather than when the source goes stale.
    fn validate_alert(&self) -> Result<()> {
        let context = AlertContext {
            name: self.name.clone(),
            source: self.source.location(),
            age: format_std_duration(self.max_age),
            max_age: format_std_duration(self.max_age),
            latest: format_latest(None),
        };
        self.alert_template()?
            .render(&context)
            .with_context(|| format!("Invalid alert copy for check '{}'", self.name))?;
        Ok(())
    }

    pub fn build(&self) -> Result<Check> {
        let alert = self.alert_template()?;

        Ok(Check {
            name: self.name.clone(),
            source: self
                .source
                .build()
                .with_context(|| format!("Invalid source for check '{}'", self.name))?,
            policy: self.policy()?,
            alert,
        })
    }
}

impl Config {
    /// Load and merge every file in order. With no paths the default
    /// location is used.
    pub fn load(paths: &[PathBuf]) -> Result<Self> {
        let default_path;
        let paths = if paths.is_empty() {
            default_path = [Self::default_path()?];
            &default_path[..]
        } else {
            paths
        };

        let mut merged = toml::Value::Table(toml::map::Map::new());
        for path in paths {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let value: toml::Value = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            merge_values(&mut merged, value);
        }

        let mut config = merged
            .try_into::<Self>()
            .context("Invalid configuration after merging config files")?;
        config.resolve_secrets();
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(contents).context("Failed to parse configuration")?;
        config.resolve_secrets();
        Ok(config)
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home
            .join(".config")
            .join("freshness-monitor")
            .join("config.toml"))
    }

    /// Fill remote secrets that are not set inline from the `[secrets]` table.
    fn resolve_secrets(&mut self) {
        for check in &mut self.checks {
            if let SourceDescriptor::RemoteListing { secret, .. } = &mut check.source {
                if secret.is_none() {
                    *secret = self.secrets.get(&check.name).cloned();
                }
            }
        }
    }

    /// Replace the location of named checks (`NAME=VALUE` from the command line).
    pub fn apply_locations(&mut self, overrides: &[(String, String)]) -> Result<()> {
        for (name, value) in overrides {
            let check = self
                .checks
                .iter_mut()
                .find(|c| &c.name == name)
                .with_context(|| format!("Cannot override location: no check named '{name}'"))?;
            tracing::debug!(check = %name, location = %value, "overriding check location");
            check.source.set_location(value);
        }
        Ok(())
    }

    pub fn enabled_checks(&self) -> impl Iterator<Item = &CheckConfig> {
        self.checks.iter().filter(|c| c.enabled)
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for check in &self.checks {
            if check.name.trim().is_empty() {
                anyhow::bail!("Every check needs a non-empty name");
            }
            if !names.insert(check.name.as_str()) {
                anyhow::bail!("Duplicate check name: {}", check.name);
            }
            if check.max_age.is_zero() {
                anyhow::bail!("max_age of check '{}' must be greater than zero", check.name);
            }
            if let Some(bound) = check.suppress_after {
                if bound <= check.max_age {
                    anyhow::bail!(
                        "suppress_after of check '{}' must be greater than its max_age",
                        check.name
                    );
                }
            }
            if check.enabled {
                if let SourceDescriptor::RemoteListing { secret: None, .. } = check.source {
                    anyhow::bail!(
                        "No secret for check '{}': set `secret` or add it under [secrets]",
                        check.name
                    );
                }
                check.validate_alert()?;
            }
        }

        if !self.notification.recipients.is_empty() {
            let smtp = self
                .notification
                .smtp
                .as_ref()
                .context("Recipients are configured but [notification.smtp] is missing")?;
            if smtp.password.is_none() {
                anyhow::bail!("[notification.smtp] has no password; pass a credentials file");
            }
            parse_mailbox(&smtp.account).context("Invalid [notification.smtp] account")?;
            for recipient in &self.notification.recipients {
                parse_mailbox(recipient).context("Invalid alert recipient")?;
            }
        }

        Ok(())
    }

    pub fn build_checks(&self) -> Result<Vec<Check>> {
        self.enabled_checks().map(CheckConfig::build).collect()
    }

    /// Mail when recipients are configured, the log otherwise (or when
    /// `dry_run` is set).
    pub fn build_sink(&self, dry_run: bool) -> Result<Arc<dyn NotificationSink>> {
        let recipients = &self.notification.recipients;
        if dry_run || recipients.is_empty() {
            tracing::info!(dry_run, "alerts will be written to the log");
            return Ok(Arc::new(LogSink::new()));
        }

        let smtp = self
            .notification
            .smtp
            .as_ref()
            .context("Recipients are configured but [notification.smtp] is missing")?;
        let relay = SmtpRelay {
            server: smtp.server.clone(),
            port: smtp.port,
            account: smtp.account.clone(),
            password: smtp.password.clone().unwrap_or_default(),
            timeout: smtp.timeout,
        };
        let sink = EmailSink::new(&relay, recipients).context("Invalid mail settings")?;
        tracing::info!(
            server = %relay.server,
            port = relay.port,
            recipients = recipients.len(),
            "alerts will be sent by email"
        );
        Ok(Arc::new(sink))
    }

    /// Copy with every secret replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        for secret in config.secrets.values_mut() {
            *secret = REDACTED.to_string();
        }
        if let Some(smtp) = config.notification.smtp.as_mut() {
            if smtp.password.is_some() {
                smtp.password = Some(REDACTED.to_string());
            }
        }
        for check in &mut config.checks {
            if let SourceDescriptor::RemoteListing {
                secret: Some(secret),
                ..
            } = &mut check.source
            {
                *secret = REDACTED.to_string();
            }
        }
        config
    }

    /// Write the commented sample configuration to `path`.
    pub fn write_sample(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        fs::write(path, Self::sample_toml())
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Sample configuration with comments explaining every option
    pub fn sample_toml() -> String {
        let mut output = String::new();

        output.push_str("# freshness-monitor configuration\n");
        output.push_str("#\n");
        output.push_str("# Several files can be combined with repeated --config flags and a\n");
        output.push_str("# --credentials file. Tables are merged, arrays (checks, recipients)\n");
        output.push_str("# are appended, and later values replace earlier ones.\n");
        output.push_str("\n");

        output.push_str("# =============================================================================\n");
        output.push_str("# RUN SETTINGS\n");
        output.push_str("# =============================================================================\n");
        output.push_str("\n");
        output.push_str("[run]\n");
        output.push_str("# true  - each check runs on its own blocking task\n");
        output.push_str("# false - checks run one after another\n");
        output.push_str("parallel = true\n");
        output.push_str("\n");

        output.push_str("# =============================================================================\n");
        output.push_str("# NOTIFICATION SETTINGS\n");
        output.push_str("# =============================================================================\n");
        output.push_str("\n");
        output.push_str("[notification]\n");
        output.push_str("# Who receives alert mail. Leave empty to only log alerts.\n");
        output.push_str("recipients = []\n");
        output.push_str("\n");
        output.push_str("# Outbound relay, reached over implicit TLS. Keep the password in a\n");
        output.push_str("# separate credentials file:\n");
        output.push_str("#\n");
        output.push_str("#   [notification.smtp]\n");
        output.push_str("#   password = \"...\"\n");
        output.push_str("#\n");
        output.push_str("# [notification.smtp]\n");
        output.push_str("# server = \"smtp.gmail.com\"\n");
        output.push_str("# port = 465\n");
        output.push_str("# account = \"monitor@example.org\"\n");
        output.push_str("# timeout = \"30s\"\n");
        output.push_str("\n");

        output.push_str("# =============================================================================\n");
        output.push_str("# CHECKS\n");
        output.push_str("# =============================================================================\n");
        output.push_str("#\n");
        output.push_str("# Durations use humantime syntax: \"90m\", \"2h\", \"1day 12h\".\n");
        output.push_str("# Alert subject/body are Handlebars templates; available values are\n");
        output.push_str("# {{name}}, {{source}}, {{age}}, {{max_age}} and {{latest}}.\n");
        output.push_str("# suppress_after stops repeated alerts once a source has been stale\n");
        output.push_str("# for that long.\n");
        output.push_str("\n");

        output.push_str("[[checks]]\n");
        output.push_str("name = \"l0-tx\"\n");
        output.push_str("max_age = \"1h\"\n");
        output.push_str("subject = \"ALERT: aws-l0/tx files are not updating!\"\n");
        output.push_str("body = \"\"\"\n");
        output.push_str("The most recently updated file at {{source}} is {{age}} old.\n");
        output.push_str("There could be a problem with the processing.\n");
        output.push_str("\"\"\"\n");
        output.push_str("[checks.source]\n");
        output.push_str("kind = \"local_tree\"\n");
        output.push_str("root = \"/data/aws-l0/tx\"\n");
        output.push_str("skip_hidden = true\n");
        output.push_str("include_directories = false\n");
        output.push_str("\n");

        output.push_str("[[checks]]\n");
        output.push_str("name = \"monitor-file\"\n");
        output.push_str("max_age = \"1h\"\n");
        output.push_str("suppress_after = \"2h\"\n");
        output.push_str("subject = \"ALERT: {{name}} down!\"\n");
        output.push_str("[checks.source]\n");
        output.push_str("kind = \"local_tree\"\n");
        output.push_str("root = \"/home/aws/monitor/heartbeat.txt\"\n");
        output.push_str("\n");

        output.push_str("[[checks]]\n");
        output.push_str("name = \"processing-repo\"\n");
        output.push_str("max_age = \"1day\"\n");
        output.push_str("[checks.source]\n");
        output.push_str("kind = \"git_repository\"\n");
        output.push_str("path = \"/data/processing/repo\"\n");
        output.push_str("\n");

        output.push_str("# Remote listing: names like geus_20230116T1203.bufr. The secret is\n");
        output.push_str("# looked up under [secrets] by check name when not given inline.\n");
        output.push_str("[[checks]]\n");
        output.push_str("name = \"dmi-ftp\"\n");
        output.push_str("enabled = false\n");
        output.push_str("max_age = \"2h\"\n");
        output.push_str("subject = \"ALERT: BUFR ftp server is not updated!\"\n");
        output.push_str("[checks.source]\n");
        output.push_str("kind = \"remote_listing\"\n");
        output.push_str("host = \"ftp.example.org\"\n");
        output.push_str("port = 21\n");
        output.push_str("user = \"upload\"\n");
        output.push_str("remote_directory = \"upload\"\n");
        output.push_str("timeout = \"30s\"\n");
        output.push_str("[checks.source.pattern]\n");
        output.push_str("suffix = \".bufr\"\n");
        output.push_str("token_start = \"_\"\n");
        output.push_str("token_end = \".\"\n");
        output.push_str("timestamp_format = \"%Y%m%dT%H%M\"\n");
        output.push_str("\n");
        output.push_str("# [secrets]\n");
        output.push_str("# dmi-ftp = \"...\"\n");

        output
    }
}
