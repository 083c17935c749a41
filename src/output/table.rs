use crate::alerts::{CheckResult, NotificationStatus, RunReport};
use crate::config::CheckConfig;
use crate::utils::{format_age, format_latest, format_std_duration};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Items that can be displayed as tables or JSON
pub trait OutputFormat {
    fn to_table(&self) -> String;
    fn to_json(&self) -> Result<String, serde_json::Error>;
}

/// Row for the run report table
#[derive(Tabled, Serialize, Debug)]
pub struct CheckResultRow {
    #[tabled(rename = "Check")]
    pub check: String,
    #[tabled(rename = "Outcome")]
    pub outcome: String,
    #[tabled(rename = "Latest Activity")]
    pub latest: String,
    #[tabled(rename = "Age")]
    pub age: String,
    #[tabled(rename = "Details")]
    pub details: String,
}

impl CheckResultRow {
    pub fn from_result(result: &CheckResult, report: &RunReport) -> Self {
        let details = match (&result.error, &result.notification) {
            (Some(error), _) => error.clone(),
            (None, NotificationStatus::Failed(error)) => format!("delivery failed: {error}"),
            (None, NotificationStatus::Suppressed) => "stale beyond suppression window".to_string(),
            (None, _) => match result.most_recent_identifier.as_deref() {
                Some(identifier) => identifier.to_string(),
                None if result.is_stale => "no files found".to_string(),
                None => String::new(),
            },
        };

        Self {
            check: result.check_name.clone(),
            outcome: result.outcome().to_string(),
            latest: format_latest(result.most_recent_time.as_ref()),
            age: result
                .most_recent_time
                .map(|t| format_age(report.now - t))
                .unwrap_or_else(|| "-".to_string()),
            details,
        }
    }
}

/// Row for the configured checks table
#[derive(Tabled, Serialize, Debug)]
pub struct CheckConfigRow {
    #[tabled(rename = "Check")]
    pub check: String,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "Max Age")]
    pub max_age: String,
    #[tabled(rename = "Suppress After")]
    pub suppress_after: String,
    #[tabled(rename = "Enabled")]
    pub enabled: String,
}

impl CheckConfigRow {
    pub fn from_config(check: &CheckConfig) -> Self {
        Self {
            check: check.name.clone(),
            kind: check.source.kind().to_string(),
            location: check.source.location(),
            max_age: format_std_duration(check.max_age),
            suppress_after: check
                .suppress_after
                .map(format_std_duration)
                .unwrap_or_else(|| "-".to_string()),
            enabled: if check.enabled { "yes" } else { "no" }.to_string(),
        }
    }
}

impl OutputFormat for RunReport {
    fn to_table(&self) -> String {
        if self.results.is_empty() {
            return "No checks configured.".to_string();
        }

        let rows: Vec<CheckResultRow> = self
            .results
            .iter()
            .map(|r| CheckResultRow::from_result(r, self))
            .collect();

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        table.to_string()
    }

    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl OutputFormat for [CheckConfig] {
    fn to_table(&self) -> String {
        if self.is_empty() {
            return "No checks configured.".to_string();
        }

        let rows: Vec<CheckConfigRow> = self.iter().map(CheckConfigRow::from_config).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        table.to_string()
    }

    fn to_json(&self) -> Result<String, serde_json::Error> {
        let rows: Vec<CheckConfigRow> = self.iter().map(CheckConfigRow::from_config).collect();
        serde_json::to_string_pretty(&rows)
    }
}
