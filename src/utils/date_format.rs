use chrono::{DateTime, Duration, Utc};

/// Timestamp as shown in reports and alert copy
pub fn format_timestamp(datetime: &DateTime<Utc>) -> String {
    datetime.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Optional timestamp, "never" when there was no activity at all
pub fn format_latest(datetime: Option<&DateTime<Utc>>) -> String {
    datetime.map(format_timestamp).unwrap_or_else(|| "never".to_string())
}

/// Age truncated to whole minutes in humantime notation, e.g. `2h 30m`.
/// Negative ages (clock skew) are shown as zero.
pub fn format_age(age: Duration) -> String {
    let minutes = age.num_minutes().max(0) as u64;
    format_std_duration(std::time::Duration::from_secs(minutes * 60))
}

pub fn format_std_duration(duration: std::time::Duration) -> String {
    humantime::format_duration(duration).to_string()
}
