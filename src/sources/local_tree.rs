use super::{ActivityRecord, FreshnessSource, Observation};
use crate::error::SourceError;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Walks a local directory tree and reports file modification times.
#[derive(Debug, Clone)]
pub struct LocalTreeSource {
    root: PathBuf,
    skip_hidden: bool,
    include_directories: bool,
}

impl LocalTreeSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip_hidden: true,
            include_directories: false,
        }
    }

    /// Ignore dot-named entries and do not descend into dot-named directories
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Let directories contribute their own modification time
    pub fn include_directories(mut self, include: bool) -> Self {
        self.include_directories = include;
        self
    }

    fn walk(&self, dir: &Path, records: &mut Vec<ActivityRecord>) -> Result<(), SourceError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            // Subdirectory removed mid-walk
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && dir != self.root => {
                tracing::debug!(path = %dir.display(), "skipping vanished directory");
                return Ok(());
            }
            Err(source) => {
                return Err(SourceError::Io {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };

        for entry in entries {
            let entry = entry.map_err(|source| SourceError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();

            if self.skip_hidden && is_hidden(&path) {
                continue;
            }

            let file_type = entry.file_type().map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })?;

            if file_type.is_dir() {
                if self.include_directories {
                    if let Some(record) = modified_record(&path, true)? {
                        records.push(record);
                    }
                }
                self.walk(&path, records)?;
            } else if let Some(record) = modified_record(&path, self.include_directories)? {
                records.push(record);
            }
        }

        Ok(())
    }
}

impl FreshnessSource for LocalTreeSource {
    fn observe(&self) -> Result<Observation, SourceError> {
        if !self.root.exists() {
            return Err(SourceError::NotFound(self.root.clone()));
        }

        let mut records = Vec::new();
        if self.root.is_dir() {
            self.walk(&self.root, &mut records)?;
        } else if let Some(record) = modified_record(&self.root, false)? {
            records.push(record);
        }

        tracing::debug!(
            root = %self.root.display(),
            files = records.len(),
            "walked local tree"
        );
        Ok(Observation::new(records))
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Modification time of `path`, following symlinks. Dangling links, special
/// files and (unless `allow_dir`) directories yield `None`.
fn modified_record(path: &Path, allow_dir: bool) -> Result<Option<ActivityRecord>, SourceError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "skipping dangling link");
            return Ok(None);
        }
        Err(source) => {
            return Err(SourceError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if !(metadata.is_file() || (allow_dir && metadata.is_dir())) {
        return Ok(None);
    }

    let modified = metadata.modified().map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(ActivityRecord::new(
        path.display().to_string(),
        DateTime::<Utc>::from(modified),
    )))
}
