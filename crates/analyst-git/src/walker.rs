// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! History walking
//!
//! This module walks the commits of a working copy inside a time window and
//! exposes, per commit, both its full file tree and its diff against the
//! first parent. Everything is read lazily through `git2`.

use chrono::{DateTime, Duration, Utc};
use git2::{
    DiffFindOptions, DiffOptions, ObjectType, Patch, Repository, Revwalk, Sort, TreeWalkMode,
    TreeWalkResult,
};
use std::iter::Peekable;
use std::path::Path;
use tracing::{debug, warn};

use crate::commit::{
    ChangeKind, Commit, FileChange, SkipReason, SkippedFile, TreeFile, commit_time,
};
use crate::error::GitError;

/// Configuration for walking commits
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Maximum number of commits to yield
    pub limit: Option<usize>,
    /// Start from this commit (defaults to HEAD)
    pub from_ref: Option<String>,
    /// Only include commits at or after this time
    pub since: Option<DateTime<Utc>>,
    /// Only include commits at or before this time
    pub until: Option<DateTime<Utc>>,
}

impl WalkOptions {
    /// Commits from the last `days` days, up to now
    #[must_use]
    pub fn last_days(days: u32) -> Self {
        Self {
            since: Some(Utc::now() - Duration::days(i64::from(days))),
            ..Default::default()
        }
    }

    /// Walk the entire history
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Stop after `n` commits
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Set the starting reference
    #[must_use]
    pub fn from(mut self, reference: &str) -> Self {
        self.from_ref = Some(reference.to_string());
        self
    }

    /// Filter commits since a date
    #[must_use]
    pub fn since(mut self, date: DateTime<Utc>) -> Self {
        self.since = Some(date);
        self
    }

    /// Filter commits until a date
    #[must_use]
    pub fn until(mut self, date: DateTime<Utc>) -> Self {
        self.until = Some(date);
        self
    }

    fn admits(&self, timestamp: DateTime<Utc>) -> bool {
        self.since.is_none_or(|since| timestamp >= since)
            && self.until.is_none_or(|until| timestamp <= until)
    }
}

/// Every readable text file of one tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDump {
    /// Text files in tree pre-order
    pub files: Vec<TreeFile>,
    /// Files that could not be decoded
    pub skipped: Vec<SkippedFile>,
}

/// The diff of one commit against its first parent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Changes with a readable patch, in diff order
    pub changes: Vec<FileChange>,
    /// Changes whose patch was binary or undecodable
    pub skipped: Vec<SkippedFile>,
}

/// A git repository wrapper for walking history
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open a git repository at the given path
    ///
    /// # Errors
    ///
    /// Returns `GitError::RepositoryNotFound` if the path is not a git repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|_| GitError::RepositoryNotFound {
            path: path.display().to_string(),
        })?;
        Ok(Self { repo })
    }

    /// Whether HEAD names a branch that has no commits yet
    fn head_is_unborn(&self) -> bool {
        match self.repo.head() {
            Ok(_) => false,
            Err(e) => is_unborn(&e),
        }
    }

    /// Start a lazy walk over commits admitted by `options`, newest first
    ///
    /// The first commit is looked up eagerly so that an empty window is
    /// reported here rather than as an empty iterator.
    ///
    /// # Errors
    ///
    /// - `GitError::EmptyHistory` if no commit falls inside the window
    /// - `GitError::InvalidReference` if `from_ref` does not resolve
    /// - `GitError::Git2` if the revision walk cannot be set up
    pub fn walk(&self, options: &WalkOptions) -> Result<HistoryWalk<'_>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;

        if let Some(ref from_ref) = options.from_ref {
            let oid = self
                .repo
                .revparse_single(from_ref)
                .and_then(|obj| obj.peel_to_commit())
                .map_err(|_| GitError::InvalidReference {
                    reference: from_ref.clone(),
                })?
                .id();
            revwalk.push(oid)?;
        } else if self.head_is_unborn() {
            return Err(empty_history(options));
        } else {
            revwalk.push_head()?;
        }

        let mut inner = RawWalk {
            repo: &self.repo,
            revwalk,
            options: options.clone(),
            yielded: 0,
        }
        .peekable();

        if inner.peek().is_none() {
            debug!(since = ?options.since, "No commits inside the window");
            return Err(empty_history(options));
        }

        Ok(HistoryWalk { inner })
    }

    /// The tree of the HEAD commit, together with that commit
    ///
    /// # Errors
    ///
    /// Returns `GitError::EmptyHistory` for a repository with no commits, or
    /// `GitError::Git2` if HEAD cannot be read.
    pub fn head_tree(&self) -> Result<(Commit, TreeDump), GitError> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if is_unborn(&e) => {
                return Err(GitError::EmptyHistory {
                    since: DateTime::<Utc>::default(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        let git_commit = head.peel_to_commit()?;
        let commit = Commit::from_git2(&git_commit);
        let dump = dump_tree(&self.repo, &git_commit)?;
        Ok((commit, dump))
    }

    /// Get the HEAD commit SHA
    ///
    /// # Errors
    ///
    /// Returns `GitError::EmptyHistory` for a repository with no commits, or
    /// `GitError` if HEAD cannot be resolved.
    pub fn head_sha(&self) -> Result<String, GitError> {
        if self.head_is_unborn() {
            return Err(GitError::EmptyHistory {
                since: DateTime::<Utc>::default(),
            });
        }
        let head = self.repo.head()?;
        let oid = head.target().ok_or_else(|| GitError::InvalidReference {
            reference: "HEAD".to_string(),
        })?;
        Ok(oid.to_string())
    }

    /// Count commits reachable from HEAD, zero when HEAD is unborn
    ///
    /// # Errors
    ///
    /// Returns `GitError` if the repository cannot be walked.
    pub fn commit_count(&self) -> Result<usize, GitError> {
        if self.head_is_unborn() {
            return Ok(0);
        }
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        Ok(revwalk.count())
    }
}

fn is_unborn(e: &git2::Error) -> bool {
    matches!(
        e.code(),
        git2::ErrorCode::UnbornBranch | git2::ErrorCode::NotFound
    )
}

fn empty_history(options: &WalkOptions) -> GitError {
    GitError::EmptyHistory {
        since: options.since.unwrap_or_default(),
    }
}

/// Lazy, single-pass iterator over walked commits
///
/// Not restartable: walking again means calling [`GitRepo::walk`] again.
pub struct HistoryWalk<'repo> {
    inner: Peekable<RawWalk<'repo>>,
}

impl<'repo> Iterator for HistoryWalk<'repo> {
    type Item = Result<WalkedCommit<'repo>, GitError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

struct RawWalk<'repo> {
    repo: &'repo Repository,
    revwalk: Revwalk<'repo>,
    options: WalkOptions,
    yielded: usize,
}

impl<'repo> Iterator for RawWalk<'repo> {
    type Item = Result<WalkedCommit<'repo>, GitError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.options.limit.is_some_and(|limit| self.yielded >= limit) {
            return None;
        }

        for oid in self.revwalk.by_ref() {
            let oid = match oid {
                Ok(oid) => oid,
                Err(e) => return Some(Err(e.into())),
            };
            let git_commit = match self.repo.find_commit(oid) {
                Ok(c) => c,
                Err(e) => return Some(Err(e.into())),
            };

            // Commit dates need not decrease along a TIME-sorted walk (clock
            // skew, rebased or cherry-picked commits), so an old commit does
            // not end the walk.
            if !self.options.admits(commit_time(&git_commit)) {
                continue;
            }

            self.yielded += 1;
            let commit = Commit::from_git2(&git_commit);
            return Some(Ok(WalkedCommit {
                repo: self.repo,
                inner: git_commit,
                commit,
            }));
        }
        None
    }
}

/// One commit produced by a walk, with lazy access to its content
pub struct WalkedCommit<'repo> {
    repo: &'repo Repository,
    inner: git2::Commit<'repo>,
    commit: Commit,
}

impl<'repo> WalkedCommit<'repo> {
    /// Commit metadata
    #[must_use]
    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    /// Every text file in this commit's full tree
    ///
    /// # Errors
    ///
    /// Returns `GitError::Git2` if the tree itself cannot be read. Individual
    /// unreadable files are skipped, not errors.
    pub fn tree_files(&self) -> Result<TreeDump, GitError> {
        dump_tree(self.repo, &self.inner)
    }

    /// Changes against the first parent, `None` for a root commit
    ///
    /// # Errors
    ///
    /// Returns `GitError::Git2` if the diff cannot be computed.
    pub fn changes(&self) -> Result<Option<ChangeSet>, GitError> {
        if self.commit.is_root() {
            return Ok(None);
        }
        let parent_tree = self.inner.parent(0)?.tree()?;
        let tree = self.inner.tree()?;

        let mut opts = DiffOptions::new();
        opts.ignore_whitespace(false);
        let mut diff =
            self.repo
                .diff_tree_to_tree(Some(&parent_tree), Some(&tree), Some(&mut opts))?;

        let mut find = DiffFindOptions::new();
        find.renames(true).copies(true);
        diff.find_similar(Some(&mut find))?;

        let mut set = ChangeSet::default();
        for (idx, delta) in diff.deltas().enumerate() {
            let new_path = delta.new_file().path().map(|p| p.display().to_string());
            let old_path = delta.old_file().path().map(|p| p.display().to_string());
            let path = new_path
                .clone()
                .or_else(|| old_path.clone())
                .unwrap_or_else(|| "<unknown>".to_string());
            let kind = ChangeKind::from(delta.status());

            let skip = |reason: SkipReason| {
                warn!(
                    commit = %self.commit.short_sha(),
                    path = %path,
                    %reason,
                    "Skipping file diff"
                );
                SkippedFile {
                    path: path.clone(),
                    commit: self.commit.sha.clone(),
                    reason,
                }
            };

            if delta.flags().is_binary() {
                set.skipped.push(skip(SkipReason::Binary));
                continue;
            }

            let mut patch = match Patch::from_diff(&diff, idx) {
                Ok(Some(patch)) => patch,
                Ok(None) => {
                    set.skipped.push(skip(SkipReason::Binary));
                    continue;
                }
                Err(e) => {
                    let reason = SkipReason::Unreadable(e.message().to_string());
                    set.skipped.push(skip(reason));
                    continue;
                }
            };
            if patch.delta().flags().is_binary() {
                set.skipped.push(skip(SkipReason::Binary));
                continue;
            }

            let text = match patch.to_buf() {
                Ok(buf) => match buf.as_str() {
                    Some(text) => text.to_string(),
                    None => {
                        set.skipped.push(skip(SkipReason::NotUtf8));
                        continue;
                    }
                },
                Err(e) => {
                    let reason = SkipReason::Unreadable(e.message().to_string());
                    set.skipped.push(skip(reason));
                    continue;
                }
            };

            let old_path = old_path.filter(|old| new_path.as_ref().is_some_and(|new| new != old));
            set.changes.push(FileChange {
                old_path,
                path,
                kind,
                patch: Some(text),
            });
        }

        Ok(Some(set))
    }
}

/// Read every blob of `git_commit`'s tree as text
fn dump_tree(repo: &Repository, git_commit: &git2::Commit<'_>) -> Result<TreeDump, GitError> {
    let tree = git_commit.tree()?;
    let sha = git_commit.id().to_string();
    let short_sha = &sha[..7];
    let mut dump = TreeDump::default();

    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() != Some(ObjectType::Blob) {
            return TreeWalkResult::Ok;
        }
        let path = format!("{root}{}", String::from_utf8_lossy(entry.name_bytes()));

        let outcome = match repo.find_blob(entry.id()) {
            Ok(blob) if blob.is_binary() => Err(SkipReason::Binary),
            Ok(blob) => match std::str::from_utf8(blob.content()) {
                Ok(text) => Ok(text.to_string()),
                Err(_) => Err(SkipReason::NotUtf8),
            },
            Err(e) => Err(SkipReason::Unreadable(e.message().to_string())),
        };

        match outcome {
            Ok(content) => dump.files.push(TreeFile { path, content }),
            Err(reason) => {
                warn!(commit = %short_sha, path = %path, %reason, "Skipping file");
                dump.skipped.push(SkippedFile {
                    path,
                    commit: sha.clone(),
                    reason,
                });
            }
        }
        TreeWalkResult::Ok
    })?;

    Ok(dump)
}
