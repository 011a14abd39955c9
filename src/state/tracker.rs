//! Processed-file tracking: the durable record of which source files have
//! already been absorbed into the index.
//!
//! Files are identified by filename only. Absence from the set is the single
//! source of truth for "needs ingestion".

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{Config, STATE_FILE_NAME};
use crate::error::Result;

/// Ordered list of ingested filenames, serialized as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedFileSet {
    files: Vec<String>,
}

impl ProcessedFileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.files.iter().any(|f| f == filename)
    }

    /// Append a filename unless it is already present. Returns true if added.
    pub fn insert(&mut self, filename: impl Into<String>) -> bool {
        let filename = filename.into();
        if self.contains(&filename) {
            return false;
        }
        self.files.push(filename);
        true
    }

    /// Append several filenames, skipping ones already present.
    ///
    /// Returns the number of filenames actually added.
    pub fn extend<I, S>(&mut self, filenames: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        filenames
            .into_iter()
            .map(|f| self.insert(f))
            .filter(|added| *added)
            .count()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ProcessedFileSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Loads and saves the [`ProcessedFileSet`] at `<state_dir>/processed_files.json`.
#[derive(Debug, Clone)]
pub struct ProcessedFileTracker {
    path: PathBuf,
}

impl ProcessedFileTracker {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(STATE_FILE_NAME),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.state_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted set; a missing state file is a cold start and yields
    /// an empty set.
    pub fn load(&self) -> Result<ProcessedFileSet> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No state file at {}, starting fresh", self.path.display());
                return Ok(ProcessedFileSet::new());
            }
            Err(e) => return Err(e.into()),
        };

        let set: ProcessedFileSet = serde_json::from_slice(&bytes)?;
        log::debug!("Loaded {} processed file(s) from {}", set.len(), self.path.display());
        Ok(set)
    }

    /// Replace the persisted set with `set`.
    ///
    /// Full-replace write: callers pass the complete updated set. Output is
    /// pretty-printed with four-space indentation and non-ASCII filenames are
    /// written verbatim.
    pub fn save(&self, set: &ProcessedFileSet) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        set.serialize(&mut serializer)?;

        super::write_atomic(&self.path, &buf)?;
        log::debug!("Saved {} processed file(s) to {}", set.len(), self.path.display());
        Ok(())
    }
}
