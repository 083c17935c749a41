use super::{ActivityRecord, FreshnessSource, Observation};
use crate::error::SourceError;
use anyhow::Context;
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::ToSocketAddrs;
use std::time::Duration;
use suppaftp::{FtpError, FtpStream, Status};

/// How timestamps are embedded in remote filenames, e.g.
/// `geus_20230116T1203.bufr` with the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingPattern {
    /// Only names ending in this suffix are considered
    pub suffix: String,
    /// The token starts after the first occurrence of this character
    pub token_start: char,
    /// ...and runs up to the next occurrence of this one
    pub token_end: char,
    /// chrono format of the token; always interpreted as UTC
    pub timestamp_format: String,
}

impl Default for ListingPattern {
    fn default() -> Self {
        Self {
            suffix: ".bufr".to_string(),
            token_start: '_',
            token_end: '.',
            timestamp_format: "%Y%m%dT%H%M".to_string(),
        }
    }
}

/// Fetches the raw lines of a remote directory listing.
pub trait ListingClient: Send + Sync {
    fn list(&self, directory: &str) -> Result<Vec<String>, SourceError>;

    fn endpoint(&self) -> String;
}

/// Plain FTP listing client: connect, login, CWD, NLST.
#[derive(Clone)]
pub struct FtpListingClient {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub secret: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for FtpListingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtpListingClient")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl FtpListingClient {
    fn connect(&self) -> Result<FtpStream, SourceError> {
        let connect_err = |reason: String| SourceError::Connect {
            host: self.host.clone(),
            reason,
        };

        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err("host did not resolve".to_string()))?;

        let stream =
            FtpStream::connect_timeout(addr, self.timeout).map_err(|e| connect_err(e.to_string()))?;
        stream
            .get_ref()
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| connect_err(e.to_string()))?;
        Ok(stream)
    }
}

impl ListingClient for FtpListingClient {
    fn list(&self, directory: &str) -> Result<Vec<String>, SourceError> {
        tracing::debug!(host = %self.host, port = self.port, "connecting to ftp server");
        let mut ftp = self.connect()?;

        ftp.login(self.user.as_str(), self.secret.as_str())
            .map_err(|e| SourceError::Login {
                host: self.host.clone(),
                user: self.user.clone(),
                reason: e.to_string(),
            })?;

        ftp.cwd(directory)
            .map_err(|e| SourceError::ChangeDirectory {
                directory: directory.to_string(),
                reason: e.to_string(),
            })?;

        let lines = match ftp.nlst(None) {
            Ok(lines) => lines,
            Err(e) if is_empty_listing_reply(&e) => {
                tracing::debug!(host = %self.host, directory, reply = %e, "empty remote directory");
                Vec::new()
            }
            Err(e) => {
                return Err(SourceError::Listing {
                    directory: directory.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        if let Err(e) = ftp.quit() {
            tracing::debug!(host = %self.host, error = %e, "ftp quit failed");
        }

        Ok(lines)
    }

    fn endpoint(&self) -> String {
        format!("ftp://{}:{}", self.host, self.port)
    }
}

/// Some servers answer NLST on an empty directory with 550 rather than an
/// empty listing. Only meaningful once CWD into the directory succeeded.
fn is_empty_listing_reply(error: &FtpError) -> bool {
    matches!(error, FtpError::UnexpectedResponse(reply) if reply.status == Status::FileUnavailable)
}

/// Observes a remote directory by parsing timestamps out of its filenames.
/// Listing order is never trusted.
pub struct RemoteListingSource<C> {
    client: C,
    directory: String,
    pattern: ListingPattern,
    token: Regex,
}

impl<C: ListingClient> RemoteListingSource<C> {
    pub fn new(client: C, directory: String, pattern: ListingPattern) -> anyhow::Result<Self> {
        let start = regex::escape(&pattern.token_start.to_string());
        let end = regex::escape(&pattern.token_end.to_string());
        let token = Regex::new(&format!("^[^{start}]*{start}([^{end}]*){end}"))
            .with_context(|| format!("Invalid token delimiters in pattern: {pattern:?}"))?;

        Ok(Self {
            client,
            directory,
            pattern,
            token,
        })
    }

    /// Parse one listing line into a record, or `None` if it does not match.
    pub fn parse_line(&self, line: &str) -> Option<ActivityRecord> {
        let field = line.split_whitespace().last()?;
        let name = field.rsplit('/').next().unwrap_or(field);

        if !name.ends_with(&self.pattern.suffix) {
            return None;
        }

        let token = self.token.captures(name)?.get(1)?.as_str();
        let naive = NaiveDateTime::parse_from_str(token, &self.pattern.timestamp_format).ok()?;

        Some(ActivityRecord::new(name, naive.and_utc()))
    }
}

impl<C: ListingClient> FreshnessSource for RemoteListingSource<C> {
    fn observe(&self) -> Result<Observation, SourceError> {
        let lines = self.client.list(&self.directory)?;

        let mut observation = Observation::default();
        for line in lines.iter().filter(|l| !l.trim().is_empty()) {
            match self.parse_line(line) {
                Some(record) => observation.records.push(record),
                None => observation.skipped += 1,
            }
        }

        tracing::debug!(
            source = %self.describe(),
            parsed = observation.records.len(),
            skipped = observation.skipped,
            "parsed remote listing"
        );
        Ok(observation)
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.client.endpoint(), self.directory)
    }
}
