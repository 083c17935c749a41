pub mod check;
pub mod message;
pub mod notifications;
pub mod system;
pub mod thresholds;

pub use check::{Check, CheckOutcome, CheckReason, CheckResult, NotificationStatus};
pub use message::{AlertContext, AlertMessage, AlertTemplate};
pub use notifications::{EmailSink, LogSink, NotificationSink, SmtpRelay};
pub use system::{Pipeline, RunReport};
pub use thresholds::{is_stale, StalenessPolicy, Verdict};
