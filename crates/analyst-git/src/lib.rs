// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! analyst-git: repository extraction for code-analyst
//!
//! This library crate clones or reuses a working copy, walks its history
//! inside a time window and aggregates commits, trees or diffs into a single
//! text artifact for the report service.

#![warn(missing_docs)]

//! # Example
//!
//! ```no_run
//! use analyst_git::{Aggregator, ContentMode, RepoAccessor, RepoRef, WalkOptions};
//!
//! let accessor = RepoAccessor::new("./repos");
//! let checkout = accessor
//!     .open_or_clone(&RepoRef::from_url("https://github.com/rust-lang/log.git"))
//!     .expect("clone");
//!
//! let walk = checkout.repo().walk(&WalkOptions::last_days(7)).expect("walk");
//! let artifact = Aggregator::new(ContentMode::Diffs)
//!     .aggregate_walk(walk)
//!     .expect("aggregate");
//! println!("{}", artifact.render());
//! ```

pub mod accessor;
pub mod artifact;
pub mod commit;
pub mod error;
pub mod lock;
pub mod repo_ref;
pub mod walker;

pub use accessor::{Checkout, RepoAccessor};
pub use artifact::{
    Aggregator, Artifact, Budget, ContentMode, Section, SectionSource, Truncation, escape_line,
    parse_sources, unescape_line,
};
pub use commit::{ChangeKind, Commit, FileChange, SkipReason, SkippedFile, TreeFile};
pub use error::GitError;
pub use repo_ref::{Credentials, RepoRef};
pub use walker::{ChangeSet, GitRepo, HistoryWalk, TreeDump, WalkOptions, WalkedCommit};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::accessor::RepoAccessor;
    pub use crate::artifact::{Aggregator, Artifact, Budget, ContentMode};
    pub use crate::error::GitError;
    pub use crate::repo_ref::{Credentials, RepoRef};
    pub use crate::walker::{GitRepo, WalkOptions};
}
