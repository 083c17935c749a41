pub mod merge;
pub mod settings;

pub use settings::{CheckConfig, Config, NotificationConfig, RunConfig, SmtpConfig};
