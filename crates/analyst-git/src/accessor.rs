// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Clone-or-open access to working copies
//!
//! # Example
//!
//! ```no_run
//! use analyst_git::{RepoAccessor, RepoRef};
//!
//! let accessor = RepoAccessor::new("./repos");
//! let checkout = accessor
//!     .open_or_clone(&RepoRef::from_url("https://github.com/rust-lang/log.git"))
//!     .expect("clone");
//! println!("{} (fresh: {})", checkout.path().display(), checkout.freshly_cloned());
//! ```

use git2::build::RepoBuilder;
use git2::{Cred, FetchOptions, RemoteCallbacks};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::GitError;
use crate::lock::WorkingCopyLock;
use crate::repo_ref::RepoRef;
use crate::walker::GitRepo;

/// Default upper bound on waiting for another run's clone
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(600);

/// Resolves repository references to local working copies under one root
#[derive(Debug, Clone)]
pub struct RepoAccessor {
    root: PathBuf,
    lock_timeout: Duration,
}

/// A usable local working copy
pub struct Checkout {
    repo: GitRepo,
    path: PathBuf,
    freshly_cloned: bool,
}

impl Checkout {
    /// The opened repository
    #[must_use]
    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// Working copy directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` when this call performed the clone, `false` when an existing
    /// copy was reused as-is
    #[must_use]
    pub fn freshly_cloned(&self) -> bool {
        self.freshly_cloned
    }
}

impl RepoAccessor {
    /// Create an accessor that keeps working copies under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Override how long to wait for a concurrent run holding the lock
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Directory under which working copies live
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the working copy for `reference` lives
    #[must_use]
    pub fn target_path(&self, reference: &RepoRef) -> PathBuf {
        self.root.join(reference.local_name())
    }

    /// Return a working copy for `reference`, cloning it if absent
    ///
    /// An existing copy is reused without fetching, so it may lag behind the
    /// remote. The check and the clone happen under a per-path lock.
    ///
    /// # Errors
    ///
    /// - `GitError::Clone` if the clone fails
    /// - `GitError::RepositoryNotFound` if the target exists but is not a repository
    /// - `GitError::LockTimeout` if another run holds the lock too long
    pub fn open_or_clone(&self, reference: &RepoRef) -> Result<Checkout, GitError> {
        let target = self.target_path(reference);
        fs::create_dir_all(&self.root)?;

        let _lock = WorkingCopyLock::acquire(&target, self.lock_timeout)?;

        if target.exists() {
            info!(path = %target.display(), "Reusing existing working copy");
            let repo = GitRepo::open(&target)?;
            return Ok(Checkout {
                repo,
                path: target,
                freshly_cloned: false,
            });
        }

        info!(url = %reference.url(), path = %target.display(), "Cloning repository");
        match clone_into(reference, &target) {
            Ok(()) => {
                let repo = GitRepo::open(&target)?;
                info!(path = %target.display(), "Repository cloned");
                Ok(Checkout {
                    repo,
                    path: target,
                    freshly_cloned: true,
                })
            }
            Err(source) => {
                if target.exists() {
                    debug!(path = %target.display(), "Removing partial clone");
                    if let Err(e) = fs::remove_dir_all(&target) {
                        warn!(path = %target.display(), error = %e, "Failed to remove partial clone");
                    }
                }
                Err(GitError::Clone {
                    url: reference.url().to_string(),
                    source,
                })
            }
        }
    }
}

fn clone_into(reference: &RepoRef, target: &Path) -> Result<(), git2::Error> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(creds) = reference.credentials().cloned() {
        let mut attempts = 0u8;
        callbacks.credentials(move |_url, _username, _allowed| {
            // libgit2 keeps asking while the server rejects; stop after one try
            attempts += 1;
            if attempts > 1 {
                return Err(git2::Error::new(
                    git2::ErrorCode::Auth,
                    git2::ErrorClass::Http,
                    "credentials rejected",
                ));
            }
            Cred::userpass_plaintext(&creds.username, &creds.token)
        });
    }

    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks);

    RepoBuilder::new()
        .fetch_options(fetch)
        .clone(reference.url(), target)?;
    Ok(())
}
