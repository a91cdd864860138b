//! Read-modify-write transactions over a single manifest file.
//!
//! A transaction snapshots the file before the first write and keeps a
//! `<file>.backup` copy on disk until it is committed. Anything short of a
//! commit puts the original bytes back, including when the transaction is
//! dropped during unwinding or the process is interrupted while a
//! [`RevertGuard`] holds the snapshot.

use crate::atomic::{AtomicWriter, WriteResult, sibling};
use crate::error::{ManifestError, Result};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const BACKUP_SUFFIX: &str = "backup";

/// Contents of a file at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSnapshot {
    path: PathBuf,
    original: Option<Vec<u8>>,
}

impl ManifestSnapshot {
    /// Capture `path`; a missing file is recorded as absent.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read.
    pub fn capture(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let original = match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(ManifestError::io(&path, e)),
        };
        Ok(Self { path, original })
    }

    /// File the snapshot belongs to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes captured, `None` when the file did not exist.
    #[must_use]
    pub fn original(&self) -> Option<&[u8]> {
        self.original.as_deref()
    }

    /// Put the file back exactly as captured.
    ///
    /// Does not take the manifest lock so it can run while a writer in the
    /// same process still holds it.
    ///
    /// # Errors
    /// Returns error if the file cannot be rewritten or removed.
    pub fn restore(&self) -> Result<()> {
        match &self.original {
            Some(bytes) => {
                if fs::read(&self.path).is_ok_and(|current| current == *bytes) {
                    return Ok(());
                }
                let temp = sibling(&self.path, "restore");
                let mut file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&temp)
                    .map_err(|e| ManifestError::io(&temp, e))?;
                file.write_all(bytes).map_err(|e| ManifestError::io(&temp, e))?;
                file.sync_all().map_err(|e| ManifestError::io(&temp, e))?;
                drop(file);
                fs::rename(&temp, &self.path).map_err(|e| ManifestError::io(&self.path, e))?;
            }
            None => match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(ManifestError::io(&self.path, e)),
            },
        }
        debug!(path = %self.path.display(), "Restored manifest snapshot");
        Ok(())
    }
}

/// Snapshots to restore if the process is interrupted.
///
/// Cloned into the signal handling task; transactions arm it on begin and
/// disarm it once they commit or roll back. Guarded writes and
/// [`revert`](Self::revert) are serialized, and no guarded write happens
/// after a revert.
#[derive(Debug, Clone, Default)]
pub struct RevertGuard {
    state: Arc<Mutex<GuardState>>,
}

#[derive(Debug, Default)]
struct GuardState {
    snapshots: Vec<ManifestSnapshot>,
    interrupted: bool,
}

impl RevertGuard {
    /// Create an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a snapshot to restore on [`revert`](Self::revert).
    pub fn arm(&self, snapshot: ManifestSnapshot) {
        let mut state = self.state.lock();
        state.snapshots.retain(|s| s.path != snapshot.path);
        state.snapshots.push(snapshot);
    }

    /// Forget the snapshot for `path`.
    pub fn disarm(&self, path: &Path) {
        self.state.lock().snapshots.retain(|s| s.path != path);
    }

    /// Number of armed snapshots.
    #[must_use]
    pub fn armed(&self) -> usize {
        self.state.lock().snapshots.len()
    }

    /// Whether [`revert`](Self::revert) has run.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.state.lock().interrupted
    }

    /// Run a write unless the guard was already reverted.
    pub(crate) fn write<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let state = self.state.lock();
        if state.interrupted {
            return Err(ManifestError::TransactionState("interrupted".into()));
        }
        let result = f();
        drop(state);
        result
    }

    /// Restore every armed snapshot, newest first, and disarm them.
    ///
    /// Returns how many files were restored. Keeps going after a failed
    /// restore and reports the first error.
    ///
    /// # Errors
    /// Returns the first restore error.
    pub fn revert(&self) -> Result<usize> {
        let mut state = self.state.lock();
        state.interrupted = true;
        let snapshots = std::mem::take(&mut state.snapshots);
        let mut first_error = None;
        let mut restored = 0;
        for snapshot in snapshots.iter().rev() {
            match snapshot.restore() {
                Ok(()) => {
                    restored += 1;
                    let _ = fs::remove_file(sibling(&snapshot.path, BACKUP_SUFFIX));
                }
                Err(err) => {
                    warn!(path = %snapshot.path.display(), error = %err, "Failed to revert manifest");
                    first_error.get_or_insert(err);
                }
            }
        }
        drop(state);
        match first_error {
            Some(err) => Err(err),
            None => Ok(restored),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Committed,
    RolledBack,
}

/// Read-modify-write transaction on one manifest file.
#[derive(Debug)]
pub struct ManifestTransaction {
    snapshot: ManifestSnapshot,
    backup_path: PathBuf,
    writer: AtomicWriter,
    guard: Option<RevertGuard>,
    written: bool,
    state: State,
}

impl ManifestTransaction {
    /// Lock `path`, snapshot it and write `<file>.backup`.
    ///
    /// # Errors
    /// Returns error if the lock, the snapshot or the backup fails.
    pub fn begin(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let writer = AtomicWriter::new(path)?;
        let snapshot = ManifestSnapshot::capture(path)?;
        let backup_path = sibling(path, BACKUP_SUFFIX);
        if let Some(bytes) = snapshot.original() {
            fs::write(&backup_path, bytes).map_err(|e| ManifestError::io(&backup_path, e))?;
        }
        debug!(path = %path.display(), existed = snapshot.original().is_some(), "Began manifest transaction");

        Ok(Self {
            snapshot,
            backup_path,
            writer,
            guard: None,
            written: false,
            state: State::Pending,
        })
    }

    /// Arm `guard` with this transaction's snapshot until it finishes.
    #[must_use]
    pub fn guarded(mut self, guard: &RevertGuard) -> Self {
        guard.arm(self.snapshot.clone());
        self.guard = Some(guard.clone());
        self
    }

    /// Snapshot taken on begin.
    #[must_use]
    pub const fn snapshot(&self) -> &ManifestSnapshot {
        &self.snapshot
    }

    /// Backup file path.
    #[must_use]
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Whether anything has been written yet.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        self.written
    }

    /// Replace the manifest content.
    ///
    /// # Errors
    /// Returns error if the transaction is finished or the write fails.
    pub fn write(&mut self, content: &str) -> Result<WriteResult> {
        self.ensure_pending()?;
        let writer = &self.writer;
        let written = &mut self.written;
        let mut write = || {
            *written = true;
            writer.write(content.as_bytes())
        };
        match &self.guard {
            Some(guard) => guard.write(write),
            None => write(),
        }
    }

    /// Keep the written content and drop the backup.
    ///
    /// # Errors
    /// Returns error if the transaction is already finished.
    pub fn commit(mut self) -> Result<()> {
        self.ensure_pending()?;
        if let Some(guard) = &self.guard {
            guard.disarm(self.snapshot.path());
        }
        self.state = State::Committed;
        if self.backup_path.exists()
            && let Err(e) = fs::remove_file(&self.backup_path)
        {
            warn!(backup = %self.backup_path.display(), error = %e, "Failed to remove manifest backup");
        }
        debug!(path = %self.snapshot.path().display(), "Committed manifest transaction");
        Ok(())
    }

    /// Restore the original bytes.
    ///
    /// # Errors
    /// Returns error if the transaction is finished or the restore fails.
    pub fn rollback(mut self) -> Result<()> {
        self.ensure_pending()?;
        self.revert()
    }

    fn revert(&mut self) -> Result<()> {
        if let Some(guard) = &self.guard {
            guard.disarm(self.snapshot.path());
        }
        self.state = State::RolledBack;
        if self.written {
            self.snapshot.restore()?;
            info!(path = %self.snapshot.path().display(), "Reverted manifest to its original content");
        }
        let _ = fs::remove_file(&self.backup_path);
        Ok(())
    }

    fn ensure_pending(&self) -> Result<()> {
        match self.state {
            State::Pending => Ok(()),
            State::Committed => Err(ManifestError::TransactionState("already committed".into())),
            State::RolledBack => Err(ManifestError::TransactionState("already rolled back".into())),
        }
    }
}

impl Drop for ManifestTransaction {
    fn drop(&mut self) {
        if self.state == State::Pending {
            warn!(path = %self.snapshot.path().display(), "Manifest transaction dropped, rolling back");
            if let Err(err) = self.revert() {
                warn!(error = %err, "Rollback failed; original content is kept in {}", self.backup_path.display());
            }
        }
    }
}
