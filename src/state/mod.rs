//! Durable pipeline state kept next to the vector index: the processed-file
//! set, the pending-commit journal and the run lock.

pub mod journal;
pub mod lock;
pub mod tracker;

pub use journal::{CommitJournal, PendingCommit};
pub use lock::RunLock;
pub use tracker::{ProcessedFileSet, ProcessedFileTracker};

use atomic_write_file::AtomicWriteFile;
use std::io::Write;
use std::path::Path;

use crate::error::Result;

/// Replace `path` with `bytes` atomically.
///
/// Readers observe either the previous content or the new content, never a
/// partially written file. Parent directories are created on first use.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = AtomicWriteFile::options().open(path)?;
    if let Err(e) = file.write_all(bytes) {
        file.discard()?;
        return Err(e.into());
    }
    file.commit()?;

    Ok(())
}

/// Remove a file, treating "already gone" as success.
pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
