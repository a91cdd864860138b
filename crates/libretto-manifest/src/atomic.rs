//! Crash-safe manifest writes.
//!
//! Content goes to a sibling temp file, is verified against its BLAKE3
//! digest and then renamed over the target while an exclusive `.lck` file
//! is held.

use crate::error::{ManifestError, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const TEMP_SUFFIX: &str = "tmp";
const LOCK_SUFFIX: &str = "lck";

/// File lock acquisition timeout.
const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Path next to `target` with `suffix` appended to its extension.
pub(crate) fn sibling(target: &Path, suffix: &str) -> PathBuf {
    target.with_extension(
        target
            .extension()
            .map_or_else(|| suffix.to_string(), |e| format!("{}.{suffix}", e.to_string_lossy())),
    )
}

/// Atomic file writer holding an exclusive lock for its lifetime.
#[derive(Debug)]
pub struct AtomicWriter {
    target: PathBuf,
    temp_path: PathBuf,
    lock_path: PathBuf,
    lock_file: Option<File>,
}

impl AtomicWriter {
    /// Lock `path` for writing.
    ///
    /// # Errors
    /// Returns error if the lock cannot be acquired within the timeout.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let target = path.as_ref().to_path_buf();
        let lock_path = sibling(&target, LOCK_SUFFIX);
        let temp_path = sibling(&target, TEMP_SUFFIX);
        let lock_file = acquire_lock(&lock_path)?;
        debug!(target = %target.display(), "Acquired manifest write lock");

        Ok(Self {
            target,
            temp_path,
            lock_path,
            lock_file: Some(lock_file),
        })
    }

    /// Replace the target with `content`.
    ///
    /// # Errors
    /// Returns error if writing, verifying or renaming fails.
    pub fn write(&self, content: &[u8]) -> Result<WriteResult> {
        let expected = blake3::hash(content);
        let had_existing = self.target.exists();

        {
            let mut temp = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.temp_path)
                .map_err(|e| ManifestError::io(&self.temp_path, e))?;
            temp.write_all(content)
                .map_err(|e| ManifestError::io(&self.temp_path, e))?;
            temp.sync_all()
                .map_err(|e| ManifestError::io(&self.temp_path, e))?;
        }

        let written = fs::read(&self.temp_path).map_err(|e| ManifestError::io(&self.temp_path, e))?;
        let actual = blake3::hash(&written);
        if actual != expected {
            let _ = fs::remove_file(&self.temp_path);
            return Err(ManifestError::IntegrityError {
                path: self.target.clone(),
                expected: expected.to_hex().to_string(),
                actual: actual.to_hex().to_string(),
            });
        }
        trace!(temp = %self.temp_path.display(), "Temp file integrity verified");

        fs::rename(&self.temp_path, &self.target).map_err(|e| ManifestError::io(&self.target, e))?;

        #[cfg(unix)]
        if let Some(parent) = self.target.parent()
            && let Ok(dir) = File::open(parent)
        {
            let _ = dir.sync_all();
        }

        debug!(target = %self.target.display(), bytes = content.len(), "Atomic write completed");
        Ok(WriteResult {
            path: self.target.clone(),
            bytes_written: content.len(),
            hash: expected.to_hex().to_string(),
            had_existing,
        })
    }

    /// Remove `path` under the same lock.
    ///
    /// # Errors
    /// Returns error if the file exists and cannot be removed.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ManifestError::io(&self.target, e)),
        }
    }

    /// File being written.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        if self.temp_path.exists() {
            warn!(temp = %self.temp_path.display(), "Cleaning up orphaned temp file");
            let _ = fs::remove_file(&self.temp_path);
        }
        if let Some(file) = self.lock_file.take() {
            let _ = FileExt::unlock(&file);
            drop(file);
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}

/// Result of a successful atomic write.
#[derive(Debug, Clone)]
pub struct WriteResult {
    /// Path that was written.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes_written: usize,
    /// BLAKE3 hash of the content.
    pub hash: String,
    /// Whether the file existed before.
    pub had_existing: bool,
}

fn acquire_lock(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| ManifestError::io(path, e))?;
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| ManifestError::io(path, e))?;

    let start = Instant::now();
    loop {
        // fs2 trait method; std has an inherent `try_lock_exclusive` with a different signature
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => return Ok(file),
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                if start.elapsed() > LOCK_TIMEOUT {
                    return Err(ManifestError::LockTimeout {
                        path: path.to_path_buf(),
                        timeout: LOCK_TIMEOUT,
                    });
                }
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(e) => return Err(ManifestError::io(path, e)),
        }
    }
}
