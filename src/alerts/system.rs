use crate::alerts::check::{Check, CheckOutcome, CheckResult};
use crate::alerts::notifications::NotificationSink;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Runs every configured check against one shared reference time and one
/// shared notification sink.
pub struct Pipeline {
    checks: Vec<Arc<Check>>,
    sink: Arc<dyn NotificationSink>,
    parallel: bool,
}

impl Pipeline {
    pub fn new(checks: Vec<Check>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            checks: checks.into_iter().map(Arc::new).collect(),
            sink,
            parallel: true,
        }
    }

    /// Run checks on concurrent blocking tasks (default) or one at a time
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Run every check once. Results come back in configuration order no
    /// matter how the checks were scheduled; a failing or panicking check
    /// never prevents the others from running.
    pub async fn run(&self, now: DateTime<Utc>) -> RunReport {
        tracing::info!(
            checks = self.checks.len(),
            parallel = self.parallel,
            now = %now,
            "starting freshness run"
        );

        let mut results = Vec::with_capacity(self.checks.len());
        if self.parallel {
            let handles: Vec<_> = self.checks.iter().map(|c| self.spawn(c, now)).collect();
            for (check, handle) in self.checks.iter().zip(handles) {
                results.push(join(check, handle).await);
            }
        } else {
            for check in &self.checks {
                let handle = self.spawn(check, now);
                results.push(join(check, handle).await);
            }
        }

        let report = RunReport { now, results };
        tracing::info!(
            ok = report.count(CheckOutcome::Ok),
            alerted = report.count(CheckOutcome::Alerted),
            suppressed = report.count(CheckOutcome::Suppressed),
            errors = report.count(CheckOutcome::Error),
            "freshness run finished"
        );
        report
    }

    fn spawn(&self, check: &Arc<Check>, now: DateTime<Utc>) -> JoinHandle<CheckResult> {
        let check = Arc::clone(check);
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || check.run(sink.as_ref(), now))
    }
}

async fn join(check: &Check, handle: JoinHandle<CheckResult>) -> CheckResult {
    match handle.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(check = %check.name, error = %e, "check task failed");
            CheckResult::unreachable(
                &check.name,
                check.source.describe(),
                format!("check task failed: {e}"),
            )
        }
    }
}

/// Every check's result from one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub now: DateTime<Utc>,
    pub results: Vec<CheckResult>,
}

impl RunReport {
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(CheckResult::is_error)
    }

    pub fn count(&self, outcome: CheckOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome() == outcome).count()
    }

    /// 0 when every check passed, alerted or was suppressed; 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() { 1 } else { 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::check::CheckReason;
    use crate::alerts::message::AlertTemplate;
    use crate::alerts::thresholds::StalenessPolicy;
    use crate::error::{NotificationError, SourceError};
    use crate::sources::{ActivityRecord, FreshnessSource, Observation};
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    enum Behaviour {
        Age(Duration),
        Unreachable,
        Panic,
    }

    struct ScriptedSource {
        behaviour: Behaviour,
        now: DateTime<Utc>,
    }

    impl FreshnessSource for ScriptedSource {
        fn observe(&self) -> Result<Observation, SourceError> {
            match self.behaviour {
                Behaviour::Age(age) => Ok(Observation::new(vec![ActivityRecord::new(
                    "file",
                    self.now - age,
                )])),
                Behaviour::Unreachable => Err(SourceError::Connect {
                    host: "ftp.example.org".to_string(),
                    reason: "connection refused".to_string(),
                }),
                Behaviour::Panic => panic!("adapter bug"),
            }
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<String>>);

    impl NotificationSink for RecordingSink {
        fn send_alert(&self, subject: &str, _body: &str) -> Result<(), NotificationError> {
            self.0.lock().unwrap().push(subject.to_string());
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 16, 12, 2, 0).unwrap()
    }

    fn check(name: &str, behaviour: Behaviour) -> Check {
        Check {
            name: name.to_string(),
            source: Box::new(ScriptedSource {
                behaviour,
                now: now(),
            }),
            policy: StalenessPolicy::new(Duration::hours(1)),
            alert: AlertTemplate::new("ALERT: {{name}}", "stale").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_checks() {
        for parallel in [true, false] {
            let sink = Arc::new(RecordingSink::default());
            let pipeline = Pipeline::new(
                vec![
                    check("dmi-ftp", Behaviour::Unreachable),
                    check("l0-tx", Behaviour::Age(Duration::minutes(10))),
                ],
                sink.clone(),
            )
            .parallel(parallel);

            let report = pipeline.run(now()).await;
            assert_eq!(report.results.len(), 2);
            assert_eq!(report.results[0].check_name, "dmi-ftp");
            assert_eq!(report.results[0].reason, CheckReason::SourceUnreachable);
            assert_eq!(report.results[1].check_name, "l0-tx");
            assert_eq!(report.results[1].outcome(), CheckOutcome::Ok);
            assert!(report.has_errors());
            assert_eq!(report.exit_code(), 1);
            assert!(sink.0.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_alerts_are_a_successful_run() {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = Pipeline::new(
            vec![
                check("bufr-out", Behaviour::Age(Duration::hours(3))),
                check("l3-tx", Behaviour::Age(Duration::minutes(5))),
                check("l3-joined", Behaviour::Age(Duration::hours(2))),
            ],
            sink.clone(),
        );

        let report = pipeline.run(now()).await;
        assert_eq!(report.count(CheckOutcome::Alerted), 2);
        assert_eq!(report.count(CheckOutcome::Ok), 1);
        assert_eq!(report.exit_code(), 0);

        let mut sent = sink.0.lock().unwrap().clone();
        sent.sort();
        assert_eq!(sent, vec!["ALERT: bufr-out", "ALERT: l3-joined"]);
    }

    #[tokio::test]
    async fn test_panicking_check_is_isolated() {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = Pipeline::new(
            vec![
                check("broken", Behaviour::Panic),
                check("l0-tx", Behaviour::Age(Duration::minutes(10))),
            ],
            sink,
        );

        let report = pipeline.run(now()).await;
        assert_eq!(report.results[0].outcome(), CheckOutcome::Error);
        assert_eq!(report.results[1].outcome(), CheckOutcome::Ok);
    }

    #[tokio::test]
    async fn test_empty_pipeline_succeeds() {
        let pipeline = Pipeline::new(vec![], Arc::new(RecordingSink::default()));
        let report = pipeline.run(now()).await;
        assert!(report.results.is_empty());
        assert_eq!(report.exit_code(), 0);
    }
}
