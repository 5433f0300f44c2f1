// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for analyst-git

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during repository access and history walking
#[derive(Debug, Error)]
pub enum GitError {
    /// Error from git2 library
    #[error("Git error: {0}")]
    Git2(#[from] git2::Error),

    /// Repository not found at the specified path
    #[error("Repository not found: {path}")]
    RepositoryNotFound {
        /// The path that was searched for a repository
        path: String,
    },

    /// Invalid commit reference (branch, tag, or SHA)
    #[error("Invalid commit reference: {reference}")]
    InvalidReference {
        /// The reference string that could not be resolved
        reference: String,
    },

    /// Cloning the remote failed (authentication, network, or missing remote)
    #[error("Failed to clone {url}: {source}")]
    Clone {
        /// The remote URL, without credentials
        url: String,
        /// The underlying git2 failure
        #[source]
        source: git2::Error,
    },

    /// No commits fall inside the requested time window
    #[error("No commits found since {since}")]
    EmptyHistory {
        /// Lower bound of the window that was walked
        since: DateTime<Utc>,
    },

    /// The working copy lock could not be acquired in time
    #[error("Timed out waiting for working copy lock {path}")]
    LockTimeout {
        /// Path of the lock file
        path: PathBuf,
    },

    /// Filesystem error outside of git2
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// Whether retrying the same operation might succeed
    ///
    /// Only clone failures caused by the network or transport layer count;
    /// authentication and missing-remote failures are permanent.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            GitError::Clone { source, .. } => {
                use git2::{ErrorClass, ErrorCode};
                if matches!(source.code(), ErrorCode::Auth | ErrorCode::NotFound) {
                    return false;
                }
                matches!(
                    source.class(),
                    ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Os
                )
            }
            GitError::LockTimeout { .. } => true,
            _ => false,
        }
    }
}
