//! Pending-commit journal.
//!
//! The index and the processed-file set live in separate files, so a crash
//! between persisting one and the other would otherwise leave embedded
//! chunks whose source is still considered new. The journal is written before
//! the index is persisted and removed after the state file is saved; its
//! presence at startup means the previous commit did not finish.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A commit that was started but not confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCommit {
    /// Filenames whose chunks this commit appends.
    pub files: Vec<String>,
    /// Index length before the append.
    pub base_len: usize,
    /// Index length once the append is persisted.
    pub new_len: usize,
    pub started_at: DateTime<Utc>,
}

impl PendingCommit {
    pub fn new(files: Vec<String>, base_len: usize, new_len: usize) -> Self {
        Self {
            files,
            base_len,
            new_len,
            started_at: Utc::now(),
        }
    }
}

/// Journal file at `<state_dir>/<index_name>.pending.json`.
#[derive(Debug, Clone)]
pub struct CommitJournal {
    path: PathBuf,
}

impl CommitJournal {
    pub fn new(state_dir: &Path, index_name: &str) -> Self {
        Self {
            path: state_dir.join(format!("{}.pending.json", index_name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `commit` as in flight.
    pub fn begin(&self, commit: &PendingCommit) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(commit)?;
        super::write_atomic(&self.path, &bytes)?;
        log::debug!(
            "Commit journal opened: {} file(s), index {} -> {}",
            commit.files.len(),
            commit.base_len,
            commit.new_len
        );
        Ok(())
    }

    /// The unfinished commit, if any.
    pub fn pending(&self) -> Result<Option<PendingCommit>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Mark the commit as finished.
    pub fn clear(&self) -> Result<()> {
        super::remove_if_exists(&self.path)
    }
}
