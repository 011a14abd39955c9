use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{RagindexError, Result};

/// Exclusive run lock on a state directory.
///
/// Two runs against the same state directory would both load the same stale
/// processed set and overwrite each other's index, so the pipeline holds this
/// lock for the whole run. The lock file is removed on drop. A run killed
/// hard leaves the file behind; it must then be removed by hand.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub const FILE_NAME: &'static str = ".ingest.lock";

    pub fn acquire(state_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_dir)?;
        let path = state_dir.join(Self::FILE_NAME);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(RagindexError::Locked(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        Self::claim(path, &mut file)
    }

    /// Take ownership of a freshly created lock file and stamp it. The lock
    /// exists before the stamp is written, so a failed write still removes
    /// the file on drop.
    fn claim(path: PathBuf, writer: &mut impl Write) -> Result<Self> {
        let lock = Self { path };
        writeln!(writer, "pid={} started={}", std::process::id(), chrono::Utc::now().to_rfc3339())?;
        Ok(lock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("Failed to release run lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let temp_dir = TempDir::new().unwrap();
        let lock = RunLock::acquire(temp_dir.path()).unwrap();

        let second = RunLock::acquire(temp_dir.path());
        assert!(matches!(second, Err(RagindexError::Locked(_))));

        drop(lock);
        assert!(RunLock::acquire(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_lock_file_removed_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let path = {
            let lock = RunLock::acquire(&temp_dir.path().join("db")).unwrap();
            assert!(lock.path().exists());
            lock.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_stamp_releases_lock() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(RunLock::FILE_NAME);
        std::fs::write(&path, b"").unwrap();

        let err = RunLock::claim(path.clone(), &mut FullDisk).unwrap_err();
        assert!(matches!(err, RagindexError::Io(_)));
        assert!(!path.exists());

        // The next run is not blocked
        assert!(RunLock::acquire(temp_dir.path()).is_ok());
    }
}
