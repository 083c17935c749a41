//! Error types for source adapters and notification sinks

use std::path::PathBuf;
use thiserror::Error;

/// A source could not be observed. Every variant is an "unreachable" outcome
/// for the check that owns the source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// TCP connection to the remote host failed
    #[error("failed to connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    /// Remote host rejected the credentials
    #[error("login to {host} as {user} failed: {reason}")]
    Login {
        host: String,
        user: String,
        reason: String,
    },

    /// Remote directory could not be entered
    #[error("cannot change into remote directory {directory}: {reason}")]
    ChangeDirectory { directory: String, reason: String },

    /// Remote listing request failed after a successful login
    #[error("listing {directory} failed: {reason}")]
    Listing { directory: String, reason: String },

    /// Local root path does not exist
    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// Local filesystem error while walking a tree
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `git` could not be run or exited unsuccessfully
    #[error("git failed for {}: {reason}", .path.display())]
    Git { path: PathBuf, reason: String },

    /// A timestamp without an explicit UTC offset where one is required
    #[error("timestamp {value:?} from {origin} carries no timezone offset")]
    NaiveTimestamp { origin: String, value: String },
}

/// An alert could not be delivered.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// Alert template failed to render
    #[error("failed to render alert template: {0}")]
    Template(String),

    /// A sender or recipient address is malformed
    #[error("invalid mail address {address:?}: {reason}")]
    Address { address: String, reason: String },

    /// Message could not be assembled
    #[error("failed to build message: {0}")]
    Message(String),

    /// Relay connection, authentication or transmission failed
    #[error("mail transport failed: {0}")]
    Transport(String),
}
