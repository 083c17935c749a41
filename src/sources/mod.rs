// Freshness sources: each backend yields timestamped activity records
pub mod git_repository;
pub mod local_tree;
pub mod remote_listing;

pub use git_repository::GitRepositorySource;
pub use local_tree::LocalTreeSource;
pub use remote_listing::{FtpListingClient, ListingClient, ListingPattern, RemoteListingSource};

use crate::error::SourceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One observed artifact and when it was last active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    pub identifier: String,
    pub observed_time: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(identifier: impl Into<String>, observed_time: DateTime<Utc>) -> Self {
        Self {
            identifier: identifier.into(),
            observed_time,
        }
    }
}

/// Everything a source yielded in one observation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    pub records: Vec<ActivityRecord>,
    /// Entries that were seen but did not match or parse
    pub skipped: usize,
}

impl Observation {
    pub fn new(records: Vec<ActivityRecord>) -> Self {
        Self { records, skipped: 0 }
    }

    /// The record with the latest `observed_time`, if any.
    pub fn most_recent(&self) -> Option<&ActivityRecord> {
        self.records.iter().max_by_key(|r| r.observed_time)
    }
}

/// A backend that can be asked for its latest activity.
///
/// Implementations must return `Ok` with an empty observation when the
/// source is reachable but holds nothing; `Err` is reserved for sources that
/// could not be contacted or read.
pub trait FreshnessSource: Send + Sync {
    fn observe(&self) -> Result<Observation, SourceError>;

    /// Short human-readable location, used in logs and alert copy
    fn describe(&self) -> String;
}

fn default_ftp_port() -> u16 {
    21
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

/// What to check, as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDescriptor {
    RemoteListing {
        host: String,
        #[serde(default = "default_ftp_port")]
        port: u16,
        user: String,
        /// Filled from the `[secrets]` table when absent
        #[serde(default)]
        secret: Option<String>,
        remote_directory: String,
        #[serde(default)]
        pattern: ListingPattern,
        #[serde(default = "default_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
    LocalTree {
        root: PathBuf,
        #[serde(default = "default_true")]
        skip_hidden: bool,
        #[serde(default)]
        include_directories: bool,
    },
    GitRepository {
        path: PathBuf,
    },
}

impl SourceDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceDescriptor::RemoteListing { .. } => "remote_listing",
            SourceDescriptor::LocalTree { .. } => "local_tree",
            SourceDescriptor::GitRepository { .. } => "git_repository",
        }
    }

    /// Where the source lives: host/directory or a local path.
    pub fn location(&self) -> String {
        match self {
            SourceDescriptor::RemoteListing {
                host,
                remote_directory,
                ..
            } => format!("ftp://{host}/{remote_directory}"),
            SourceDescriptor::LocalTree { root, .. } => root.display().to_string(),
            SourceDescriptor::GitRepository { path } => path.display().to_string(),
        }
    }

    /// Replace the location: the host for remote listings, the path otherwise.
    pub fn set_location(&mut self, value: &str) {
        match self {
            SourceDescriptor::RemoteListing { host, .. } => *host = value.to_string(),
            SourceDescriptor::LocalTree { root, .. } => *root = PathBuf::from(value),
            SourceDescriptor::GitRepository { path } => *path = PathBuf::from(value),
        }
    }

    /// Build the adapter that observes this source.
    pub fn build(&self) -> anyhow::Result<Box<dyn FreshnessSource>> {
        let source: Box<dyn FreshnessSource> = match self {
            SourceDescriptor::RemoteListing {
                host,
                port,
                user,
                secret,
                remote_directory,
                pattern,
                timeout,
            } => {
                let client = FtpListingClient {
                    host: host.clone(),
                    port: *port,
                    user: user.clone(),
                    secret: secret.clone().unwrap_or_default(),
                    timeout: *timeout,
                };
                Box::new(RemoteListingSource::new(
                    client,
                    remote_directory.clone(),
                    pattern.clone(),
                )?)
            }
            SourceDescriptor::LocalTree {
                root,
                skip_hidden,
                include_directories,
            } => Box::new(
                LocalTreeSource::new(root.clone())
                    .skip_hidden(*skip_hidden)
                    .include_directories(*include_directories),
            ),
            SourceDescriptor::GitRepository { path } => {
                Box::new(GitRepositorySource::new(path.clone()))
            }
        };
        Ok(source)
    }
}
