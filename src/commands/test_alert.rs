use crate::config::Config;
use anyhow::Context;

const TEST_SUBJECT: &str = "freshness-monitor alert test";
const TEST_BODY: &str = "Alert delivery is working. You will receive a message like this \
whenever a monitored source stops updating.";

/// Push one message through the sink a real run would use.
pub fn handle_test_alert_command(config: &Config, dry_run: bool) -> anyhow::Result<()> {
    let sink = config.build_sink(dry_run)?;
    sink.send_alert(TEST_SUBJECT, TEST_BODY)
        .context("Failed to send test alert")?;
    println!("Test alert sent.");
    Ok(())
}
