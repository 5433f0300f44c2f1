// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Working copy locks
//!
//! Clone-vs-reuse is a check-then-act on the filesystem, so two invocations
//! against the same target path must not interleave. An exclusive `flock`
//! on a sibling lock file serializes them across processes. The OS releases
//! the lock if the holder dies.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::GitError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Lock file path guarding `target`: `<parent>/.<name>.lock`
#[must_use]
pub fn lock_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "repository".to_string());
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{name}.lock"))
}

/// Holds an exclusive lock until dropped
#[derive(Debug)]
pub struct WorkingCopyLock {
    file: File,
    path: PathBuf,
}

impl WorkingCopyLock {
    /// Try to take the lock without blocking
    ///
    /// Returns `Ok(None)` when another holder has it.
    ///
    /// # Errors
    ///
    /// Returns `GitError::Io` if the lock file cannot be created.
    pub fn try_acquire(target: &Path) -> Result<Option<Self>, GitError> {
        let path = lock_path_for(target);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(lock = %path.display(), "Acquired working copy lock");
                Ok(Some(Self { file, path }))
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                debug!(lock = %path.display(), "Working copy lock is held elsewhere");
                Ok(None)
            }
            Err(e) => Err(GitError::Io(e)),
        }
    }

    /// Take the lock, polling until `timeout` elapses
    ///
    /// # Errors
    ///
    /// Returns `GitError::LockTimeout` if the lock is still held after
    /// `timeout`, or `GitError::Io` on filesystem failures.
    pub fn acquire(target: &Path, timeout: Duration) -> Result<Self, GitError> {
        let start = Instant::now();
        let mut announced = false;

        loop {
            if let Some(lock) = Self::try_acquire(target)? {
                if announced {
                    info!(waited = ?start.elapsed(), "Acquired working copy lock");
                }
                return Ok(lock);
            }

            if start.elapsed() >= timeout {
                let path = lock_path_for(target);
                warn!(lock = %path.display(), ?timeout, "Gave up waiting for working copy lock");
                return Err(GitError::LockTimeout { path });
            }

            if !announced {
                info!(target = %target.display(), "Waiting for another run to release the working copy");
                announced = true;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for WorkingCopyLock {
    fn drop(&mut self) {
        // The lock file itself stays on disk for reuse
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(lock = %self.path.display(), error = %e, "Failed to release working copy lock");
        }
    }
}
