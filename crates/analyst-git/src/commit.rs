// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Commit and file-change records read out of a repository
//!
//! These are plain read-only views: the walker materializes them from git2
//! objects and the aggregator turns them into artifact sections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A commit as seen by the history walker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// The commit SHA (40 hex characters)
    pub sha: String,
    /// Commit message
    pub message: String,
    /// Author name
    pub author: String,
    /// Author email
    pub author_email: String,
    /// Committer timestamp, used for time windows
    pub timestamp: DateTime<Utc>,
    /// Parent commit SHAs, first parent first
    pub parents: Vec<String>,
}

impl Commit {
    /// Build a record from a git2 commit
    #[must_use]
    pub fn from_git2(git_commit: &git2::Commit<'_>) -> Self {
        let author = git_commit.author();
        Self {
            sha: git_commit.id().to_string(),
            message: git_commit.message().unwrap_or("").to_string(),
            author: author.name().unwrap_or("Unknown").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            timestamp: commit_time(git_commit),
            parents: git_commit.parent_ids().map(|id| id.to_string()).collect(),
        }
    }

    /// Get the short SHA (first 7 characters)
    #[must_use]
    pub fn short_sha(&self) -> &str {
        &self.sha[..7.min(self.sha.len())]
    }

    /// Check if this is a root commit (has no parents)
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// First line of the commit message
    #[must_use]
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Committer time of a git2 commit as UTC
pub(crate) fn commit_time(git_commit: &git2::Commit<'_>) -> DateTime<Utc> {
    DateTime::from_timestamp(git_commit.time().seconds(), 0).unwrap_or_default()
}

/// How a file changed relative to the first parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// File did not exist in the parent
    Added,
    /// File no longer exists
    Deleted,
    /// Content changed in place
    Modified,
    /// Moved, possibly with edits
    Renamed,
    /// Copied from another path
    Copied,
    /// File mode changed (e.g. regular file to symlink)
    TypeChange,
    /// Anything else git reports
    Other,
}

impl From<git2::Delta> for ChangeKind {
    fn from(delta: git2::Delta) -> Self {
        match delta {
            git2::Delta::Added | git2::Delta::Untracked => ChangeKind::Added,
            git2::Delta::Deleted => ChangeKind::Deleted,
            git2::Delta::Modified => ChangeKind::Modified,
            git2::Delta::Renamed => ChangeKind::Renamed,
            git2::Delta::Copied => ChangeKind::Copied,
            git2::Delta::Typechange => ChangeKind::TypeChange,
            _ => ChangeKind::Other,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Added => "added",
            ChangeKind::Deleted => "deleted",
            ChangeKind::Modified => "modified",
            ChangeKind::Renamed => "renamed",
            ChangeKind::Copied => "copied",
            ChangeKind::TypeChange => "typechange",
            ChangeKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// One changed file in a commit's diff against its first parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Path after the change (the old path for deletions)
    pub path: String,
    /// Path before the change, set only when it differs from `path`
    pub old_path: Option<String>,
    /// Kind of change
    pub kind: ChangeKind,
    /// Unified diff text; `None` for binary or undecodable content
    pub patch: Option<String>,
}

/// A text file in a commit's tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeFile {
    /// Path relative to the repository root
    pub path: String,
    /// UTF-8 file content
    pub content: String,
}

/// Why a file was left out of the artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum SkipReason {
    /// Blob looks binary to git
    Binary,
    /// Content is not valid UTF-8
    NotUtf8,
    /// Blob or patch could not be read
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Binary => f.write_str("binary content"),
            SkipReason::NotUtf8 => f.write_str("content is not valid UTF-8"),
            SkipReason::Unreadable(msg) => write!(f, "unreadable: {msg}"),
        }
    }
}

/// A file the walker could not turn into text
///
/// Skips are non-fatal: the walk continues and the record travels with the
/// artifact so callers can report it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Path of the skipped file
    pub path: String,
    /// Commit the file was read from
    pub commit: String,
    /// Why it was skipped
    pub reason: SkipReason,
}
