use chrono::{Duration, Utc};
use freshness_monitor::alerts::{
    AlertTemplate, Check, CheckOutcome, CheckReason, NotificationSink, NotificationStatus,
    Pipeline, StalenessPolicy,
};
use freshness_monitor::config::Config;
use freshness_monitor::error::{NotificationError, SourceError};
use freshness_monitor::sources::{ListingClient, ListingPattern, LocalTreeSource, RemoteListingSource};
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tempfile::TempDir;

/// Integration tests for the full check pipeline: real files on disk, a fake
/// listing server and a recording sink.

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn send_alert(&self, subject: &str, body: &str) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

struct FakeListing(Vec<String>);

impl ListingClient for FakeListing {
    fn list(&self, _directory: &str) -> Result<Vec<String>, SourceError> {
        Ok(self.0.clone())
    }

    fn endpoint(&self) -> String {
        "ftp://fake:21".to_string()
    }
}

fn touch(path: &Path, age: Duration) {
    let file = File::create(path).unwrap();
    let modified = SystemTime::now() - age.to_std().unwrap();
    file.set_modified(modified).unwrap();
}

fn local_check(name: &str, root: &Path, max_age: Duration) -> Check {
    Check {
        name: name.to_string(),
        source: Box::new(LocalTreeSource::new(root)),
        policy: StalenessPolicy::new(max_age),
        alert: AlertTemplate::new("ALERT: {{name}} is not updating!", "Latest: {{latest}}")
            .unwrap(),
    }
}

#[tokio::test]
async fn test_recent_files_are_fresh() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("a.txt"), Duration::minutes(30));
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    touch(&dir.path().join("nested").join("b.txt"), Duration::minutes(45));

    let sink = Arc::new(RecordingSink::default());
    let pipeline = Pipeline::new(
        vec![local_check("processing", dir.path(), Duration::hours(1))],
        sink.clone(),
    );
    let report = pipeline.run(Utc::now()).await;

    let result = &report.results[0];
    assert!(!result.is_stale);
    assert_eq!(result.reason, CheckReason::Ok);
    assert_eq!(result.most_recent_identifier.as_deref().map(|p| p.ends_with("a.txt")), Some(true));
    assert!(sink.sent().is_empty());
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_old_files_raise_one_alert() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("old.txt"), Duration::minutes(90));

    let sink = Arc::new(RecordingSink::default());
    let pipeline = Pipeline::new(
        vec![local_check("monitor-file", dir.path(), Duration::hours(1))],
        sink.clone(),
    );
    let report = pipeline.run(Utc::now()).await;

    let result = &report.results[0];
    assert!(result.is_stale);
    assert_eq!(result.notification, NotificationStatus::Sent);
    assert_eq!(result.outcome(), CheckOutcome::Alerted);

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "ALERT: monitor-file is not updating!");
    assert!(sent[0].1.starts_with("Latest: "));
    // An alert is a successful run.
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_empty_directory_is_stale() {
    let dir = TempDir::new().unwrap();

    let sink = Arc::new(RecordingSink::default());
    let pipeline = Pipeline::new(
        vec![local_check("empty", dir.path(), Duration::hours(1))],
        sink.clone(),
    );
    let report = pipeline.run(Utc::now()).await;

    let result = &report.results[0];
    assert!(result.is_stale);
    assert_eq!(result.reason, CheckReason::NoFilesFound);
    assert_eq!(result.most_recent_time, None);
    assert_eq!(sink.sent().len(), 1);
    assert!(sink.sent()[0].1.contains("never"));
}

#[tokio::test]
async fn test_missing_directory_is_an_error_not_an_alert() {
    let dir = TempDir::new().unwrap();

    let sink = Arc::new(RecordingSink::default());
    let pipeline = Pipeline::new(
        vec![local_check("gone", &dir.path().join("missing"), Duration::hours(1))],
        sink.clone(),
    );
    let report = pipeline.run(Utc::now()).await;

    let result = &report.results[0];
    assert!(!result.is_stale);
    assert_eq!(result.reason, CheckReason::SourceUnreachable);
    assert!(result.error.is_some());
    assert!(sink.sent().is_empty());
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_remote_listing_uses_newest_token() {
    let now = Utc::now();
    let name_for = |age: Duration| {
        format!(
            "/data/l0/S_{}.bufr",
            (now - age).format("%Y%m%dT%H%M")
        )
    };
    // Out of order on purpose, plus one line that does not match.
    let listing = vec![
        name_for(Duration::minutes(400)),
        name_for(Duration::minutes(150)),
        "/data/l0/README.txt".to_string(),
        name_for(Duration::minutes(300)),
    ];
    let source = RemoteListingSource::new(
        FakeListing(listing),
        "/data/l0".to_string(),
        ListingPattern::default(),
    )
    .unwrap();

    let check = Check {
        name: "l0-tx".to_string(),
        source: Box::new(source),
        policy: StalenessPolicy::new(Duration::hours(2)),
        alert: AlertTemplate::new("{{name}} stale", "age {{age}}").unwrap(),
    };

    let sink = Arc::new(RecordingSink::default());
    let report = Pipeline::new(vec![check], sink.clone()).run(now).await;

    let result = &report.results[0];
    assert!(result.is_stale);
    assert_eq!(
        result.most_recent_identifier.as_deref(),
        Some(name_for(Duration::minutes(150)).trim_start_matches("/data/l0/"))
    );
    assert_eq!(sink.sent(), vec![("l0-tx stale".to_string(), "age 2h 30m".to_string())]);
}

#[tokio::test]
async fn test_failing_check_does_not_affect_others() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("fresh.txt"), Duration::minutes(5));

    for parallel in [true, false] {
        let sink = Arc::new(RecordingSink::default());
        let pipeline = Pipeline::new(
            vec![
                local_check("broken", &dir.path().join("nope"), Duration::hours(1)),
                local_check("healthy", dir.path(), Duration::hours(1)),
            ],
            sink.clone(),
        )
        .parallel(parallel);
        let report = pipeline.run(Utc::now()).await;

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].check_name, "broken");
        assert_eq!(report.results[0].outcome(), CheckOutcome::Error);
        assert_eq!(report.results[1].check_name, "healthy");
        assert_eq!(report.results[1].outcome(), CheckOutcome::Ok);
        assert!(sink.sent().is_empty());
        assert_eq!(report.exit_code(), 1);
    }
}

#[tokio::test]
async fn test_config_file_drives_pipeline() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    touch(&data.join("out.nc"), Duration::hours(3));

    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[run]
parallel = false

[[checks]]
name = "processing"
max_age = "1h"
subject = "{{{{name}}}} is late"
source = {{ kind = "local_tree", root = "{}" }}

[[checks]]
name = "disabled"
enabled = false
max_age = "1h"
source = {{ kind = "local_tree", root = "/does/not/exist" }}
"#,
            data.display()
        ),
    )
    .unwrap();

    let config = Config::load(&[config_path]).unwrap();
    config.validate().unwrap();
    assert!(!config.run.parallel);

    let checks = config.build_checks().unwrap();
    assert_eq!(checks.len(), 1);

    let sink = Arc::new(RecordingSink::default());
    let report = Pipeline::new(checks, sink.clone()).run(Utc::now()).await;

    assert_eq!(report.results.len(), 1);
    assert!(report.results[0].is_stale);
    assert_eq!(sink.sent()[0].0, "processing is late");
}

#[tokio::test]
async fn test_suppressed_after_long_outage() {
    let dir = TempDir::new().unwrap();
    touch(&dir.path().join("ancient.txt"), Duration::hours(10));

    let mut check = local_check("monitor-file", dir.path(), Duration::hours(1));
    check.policy = StalenessPolicy::new(Duration::hours(1))
        .with_suppress_after(Some(Duration::hours(2)));

    let sink = Arc::new(RecordingSink::default());
    let report = Pipeline::new(vec![check], sink.clone()).run(Utc::now()).await;

    let result = &report.results[0];
    assert!(result.is_stale);
    assert_eq!(result.notification, NotificationStatus::Suppressed);
    assert!(sink.sent().is_empty());
    assert_eq!(report.exit_code(), 0);
}
