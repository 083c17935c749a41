use crate::alerts::message::{AlertContext, AlertTemplate};
use crate::alerts::notifications::NotificationSink;
use crate::alerts::thresholds::{StalenessPolicy, Verdict};
use crate::sources::FreshnessSource;
use crate::utils::{format_age, format_latest};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One configured check: a source, the age it may reach, and the copy used
/// when it goes stale.
pub struct Check {
    pub name: String,
    pub source: Box<dyn FreshnessSource>,
    pub policy: StalenessPolicy,
    pub alert: AlertTemplate,
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("source", &self.source.describe())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckReason {
    Ok,
    NoFilesFound,
    SourceUnreachable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "error")]
pub enum NotificationStatus {
    NotRequired,
    Sent,
    Suppressed,
    Failed(String),
}

/// What a check ended up doing, as logged and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckOutcome {
    Ok,
    Alerted,
    Suppressed,
    Error,
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CheckOutcome::Ok => "Ok",
            CheckOutcome::Alerted => "Alerted",
            CheckOutcome::Suppressed => "Suppressed",
            CheckOutcome::Error => "Error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub check_name: String,
    pub source: String,
    pub is_stale: bool,
    pub most_recent_time: Option<DateTime<Utc>>,
    pub most_recent_identifier: Option<String>,
    pub reason: CheckReason,
    pub notification: NotificationStatus,
    pub error: Option<String>,
}

impl CheckResult {
    /// Result for a source that could not be observed at all.
    pub fn unreachable(check_name: &str, source: String, error: String) -> Self {
        Self {
            check_name: check_name.to_string(),
            source,
            is_stale: false,
            most_recent_time: None,
            most_recent_identifier: None,
            reason: CheckReason::SourceUnreachable,
            notification: NotificationStatus::NotRequired,
            error: Some(error),
        }
    }

    pub fn outcome(&self) -> CheckOutcome {
        if self.is_error() {
            return CheckOutcome::Error;
        }
        match self.notification {
            NotificationStatus::Sent => CheckOutcome::Alerted,
            NotificationStatus::Suppressed => CheckOutcome::Suppressed,
            _ => CheckOutcome::Ok,
        }
    }

    /// Unreachable sources and failed deliveries are errors; alerts are not.
    pub fn is_error(&self) -> bool {
        self.reason == CheckReason::SourceUnreachable
            || matches!(self.notification, NotificationStatus::Failed(_))
    }
}

impl Check {
    /// Observe, evaluate and, if stale, notify. Never panics on source or
    /// delivery failure; both end up in the returned result.
    pub fn run(&self, sink: &dyn NotificationSink, now: DateTime<Utc>) -> CheckResult {
        let source = self.source.describe();

        let observation = match self.source.observe() {
            Ok(observation) => observation,
            Err(e) => {
                tracing::error!(check = %self.name, source = %source, error = %e, "source unreachable");
                return CheckResult::unreachable(&self.name, source, e.to_string());
            }
        };

        let latest = observation.most_recent().cloned();
        let most_recent_time = latest.as_ref().map(|r| r.observed_time);
        let reason = if latest.is_some() {
            CheckReason::Ok
        } else {
            tracing::warn!(
                check = %self.name,
                source = %source,
                skipped = observation.skipped,
                "no files found"
            );
            CheckReason::NoFilesFound
        };

        let verdict = self.policy.evaluate(most_recent_time, now);
        let mut result = CheckResult {
            check_name: self.name.clone(),
            source: source.clone(),
            is_stale: verdict.is_stale(),
            most_recent_time,
            most_recent_identifier: latest.map(|r| r.identifier),
            reason,
            notification: NotificationStatus::NotRequired,
            error: None,
        };

        match verdict {
            Verdict::Fresh => {
                tracing::info!(
                    check = %self.name,
                    latest = %format_latest(most_recent_time.as_ref()),
                    "source is current, no alert issued"
                );
            }
            Verdict::StaleSuppressed => {
                tracing::info!(
                    check = %self.name,
                    latest = %format_latest(most_recent_time.as_ref()),
                    "source stale beyond suppression window, no alert issued"
                );
                result.notification = NotificationStatus::Suppressed;
            }
            Verdict::Stale => {
                result.notification = self.notify(sink, &source, most_recent_time, now);
            }
        }

        result
    }

    fn notify(
        &self,
        sink: &dyn NotificationSink,
        source: &str,
        most_recent_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> NotificationStatus {
        let context = AlertContext {
            name: self.name.clone(),
            source: source.to_string(),
            age: most_recent_time
                .map(|t| format_age(now - t))
                .unwrap_or_else(|| "unknown".to_string()),
            max_age: format_age(self.policy.max_age),
            latest: format_latest(most_recent_time.as_ref()),
        };

        let delivery = self
            .alert
            .render(&context)
            .and_then(|message| sink.send_alert(&message.subject, &message.body));

        match delivery {
            Ok(()) => {
                tracing::warn!(check = %self.name, age = %context.age, "source is stale, alert issued");
                NotificationStatus::Sent
            }
            Err(e) => {
                tracing::error!(check = %self.name, error = %e, "failed to deliver alert");
                NotificationStatus::Failed(e.to_string())
            }
        }
    }
}
