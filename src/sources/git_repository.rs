use super::{ActivityRecord, FreshnessSource, Observation};
use crate::error::SourceError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::process::{Command, Output};

/// Latest commit touching a path inside a git work tree. When `path` is a
/// subdirectory only commits below it count.
#[derive(Debug, Clone)]
pub struct GitRepositorySource {
    path: PathBuf,
}

impl GitRepositorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn git(&self, args: &[&str]) -> Result<Output, SourceError> {
        Command::new("git")
            .arg("-C")
            .arg(&self.path)
            .args(args)
            .output()
            .map_err(|e| SourceError::Git {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }
}

impl FreshnessSource for GitRepositorySource {
    fn observe(&self) -> Result<Observation, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::NotFound(self.path.clone()));
        }

        if !self.git(&["rev-parse", "--is-inside-work-tree"])?.status.success() {
            return Err(SourceError::Git {
                path: self.path.clone(),
                reason: "not a git work tree".to_string(),
            });
        }
        // `git log` fails outright on an unborn branch
        if !self.git(&["rev-parse", "--verify", "-q", "HEAD"])?.status.success() {
            tracing::debug!(path = %self.path.display(), "repository has no commits");
            return Ok(Observation::default());
        }

        let output = self.git(&["log", "-n", "1", "--format=%aI", "--", "."])?;
        if !output.status.success() {
            return Err(SourceError::Git {
                path: self.path.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stamp = stdout.trim();
        if stamp.is_empty() {
            // No commit touches this path
            return Ok(Observation::default());
        }

        let observed_time = parse_commit_time(stamp, &self.path.display().to_string())?;
        Ok(Observation::new(vec![ActivityRecord::new(
            self.path.display().to_string(),
            observed_time,
        )]))
    }

    fn describe(&self) -> String {
        format!("git:{}", self.path.display())
    }
}

/// Parse a strict ISO 8601 commit date. A date without an offset is refused
/// rather than assumed to be UTC.
pub fn parse_commit_time(value: &str, origin: &str) -> Result<DateTime<Utc>, SourceError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| SourceError::NaiveTimestamp {
            origin: origin.to_string(),
            value: value.to_string(),
        })
}
