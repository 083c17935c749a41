// Run command handler
use crate::alerts::{Pipeline, RunReport};
use crate::config::Config;
use crate::output::OutputFormat;
use chrono::Utc;

/// Run every enabled check once against a single reference time and print
/// the report. The caller turns the report into the exit status.
pub async fn handle_run_command(
    config: &Config,
    dry_run: bool,
    json_output: bool,
) -> anyhow::Result<RunReport> {
    let checks = config.build_checks()?;
    let sink = config.build_sink(dry_run)?;
    let pipeline = Pipeline::new(checks, sink).parallel(config.run.parallel);

    let now = Utc::now();
    let report = pipeline.run(now).await;

    if json_output {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.to_table());
    }

    Ok(report)
}
