// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Content aggregation
//!
//! Walked commits and trees are flattened into one ordered [`Artifact`] of
//! text sections. Every section opens with a delimiter line naming its
//! source, so a rendered artifact can be split back into its sources with
//! [`parse_sources`].
//!
//! ```text
//! === commit 8d1f2a6c0b9e4f7a3d5c1e2b4a6f8d0c2e4a6b8d ===
//! Author: Test Author <test@example.com>
//! ...
//!
//! --- src/lib.rs ---
//! <file content or diff>
//! ```
//!
//! Body lines that would read as a delimiter are prefixed with a backslash
//! when rendered (see [`escape_line`]), so file content and diff lines such as
//! `--- draft ---` never open a section of their own.
//!
//! Sections are kept in the order the walker yields them. Nothing is sorted
//! or deduplicated. An optional [`Budget`] drops the oldest commits first.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use crate::commit::{Commit, FileChange, SkippedFile, TreeFile};
use crate::error::GitError;
use crate::walker::{TreeDump, WalkedCommit};

const COMMIT_OPEN: &str = "=== commit ";
const COMMIT_CLOSE: &str = " ===";
const FILE_OPEN: &str = "--- ";
const FILE_CLOSE: &str = " ---";
const ESCAPE: char = '\\';

/// What each commit contributes to the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentMode {
    /// The newest commit's full tree only
    Snapshot,
    /// Every walked commit with its full tree
    FullTree,
    /// Every walked commit with its diff against the first parent
    #[default]
    Diffs,
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentMode::Snapshot => "snapshot",
            ContentMode::FullTree => "full-tree",
            ContentMode::Diffs => "diffs",
        })
    }
}

impl FromStr for ContentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snapshot" => Ok(ContentMode::Snapshot),
            "full-tree" => Ok(ContentMode::FullTree),
            "diffs" => Ok(ContentMode::Diffs),
            other => Err(format!("unknown content mode: {other}")),
        }
    }
}

/// Where a section came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SectionSource {
    /// Commit header
    Commit {
        /// Full commit SHA
        sha: String,
    },
    /// File content or file diff
    File {
        /// Path relative to the repository root
        path: String,
    },
}

impl SectionSource {
    /// The delimiter line that opens a section from this source
    #[must_use]
    pub fn delimiter(&self) -> String {
        match self {
            SectionSource::Commit { sha } => format!("{COMMIT_OPEN}{sha}{COMMIT_CLOSE}"),
            SectionSource::File { path } => format!("{FILE_OPEN}{path}{FILE_CLOSE}"),
        }
    }

    /// Recognize a delimiter line
    #[must_use]
    pub fn parse_delimiter(line: &str) -> Option<Self> {
        if let Some(sha) = line
            .strip_prefix(COMMIT_OPEN)
            .and_then(|rest| rest.strip_suffix(COMMIT_CLOSE))
        {
            if !sha.is_empty() && sha.chars().all(|c| c.is_ascii_hexdigit()) {
                return Some(SectionSource::Commit {
                    sha: sha.to_string(),
                });
            }
            return None;
        }

        line.strip_prefix(FILE_OPEN)
            .and_then(|rest| rest.strip_suffix(FILE_CLOSE))
            .filter(|path| !path.is_empty())
            .map(|path| SectionSource::File {
                path: path.to_string(),
            })
    }

    fn is_commit(&self) -> bool {
        matches!(self, SectionSource::Commit { .. })
    }
}

/// Whether a body line must be escaped when rendered
///
/// Any run of leading backslashes is ignored, so an escaped line escapes
/// again and [`unescape_line`] can always strip exactly one. A trailing `\r`
/// is ignored as well since `str::lines` drops it.
fn needs_escape(line: &str) -> bool {
    let line = line.strip_suffix('\r').unwrap_or(line);
    SectionSource::parse_delimiter(line.trim_start_matches(ESCAPE)).is_some()
}

/// Render one body line so that it cannot be read as a delimiter
#[must_use]
pub fn escape_line(line: &str) -> Cow<'_, str> {
    if needs_escape(line) {
        Cow::Owned(format!("{ESCAPE}{line}"))
    } else {
        Cow::Borrowed(line)
    }
}

/// Undo [`escape_line`]
#[must_use]
pub fn unescape_line(line: &str) -> &str {
    match line.strip_prefix(ESCAPE) {
        Some(rest) if needs_escape(line) => rest,
        _ => line,
    }
}

fn escaped_overhead(text: &str) -> usize {
    text.split('\n').filter(|line| needs_escape(line)).count()
}

fn push_escaped(out: &mut String, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&escape_line(line));
    }
}

/// One delimited block of the artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Where the body came from
    pub source: SectionSource,
    /// Section text, without the delimiter
    pub body: String,
}

impl Section {
    fn needs_newline(&self) -> bool {
        !self.body.is_empty() && !self.body.ends_with('\n')
    }

    /// Bytes this section occupies in the rendered artifact
    #[must_use]
    pub fn rendered_len(&self) -> usize {
        self.source.delimiter().len()
            + 1
            + self.body.len()
            + escaped_overhead(&self.body)
            + usize::from(self.needs_newline())
            + 1
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(&self.source.delimiter());
        out.push('\n');
        push_escaped(out, &self.body);
        if self.needs_newline() {
            out.push('\n');
        }
        out.push('\n');
    }
}

/// Upper bound on the rendered artifact size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Budget {
    /// Maximum rendered bytes; `None` means unbounded
    pub max_bytes: Option<usize>,
}

impl Budget {
    /// No limit
    #[must_use]
    pub fn unbounded() -> Self {
        Self { max_bytes: None }
    }

    /// Limit the rendered artifact to `max_bytes`
    #[must_use]
    pub fn bytes(max_bytes: usize) -> Self {
        Self {
            max_bytes: Some(max_bytes),
        }
    }
}

/// What a budget cut away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    /// Sections removed, commit headers included
    pub dropped_sections: usize,
    /// Whole commits removed
    pub dropped_commits: usize,
    /// Rendered size before truncation
    pub original_bytes: usize,
}

/// The aggregated text handed to the report service
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifact {
    preamble: Option<String>,
    sections: Vec<Section>,
    skipped: Vec<SkippedFile>,
    truncation: Option<Truncation>,
}

impl Artifact {
    /// An empty artifact
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text rendered before the first section
    #[must_use]
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    /// Append a commit header section
    pub fn push_commit(&mut self, commit: &Commit) {
        let parents = if commit.parents.is_empty() {
            "(none)".to_string()
        } else {
            commit.parents.join(", ")
        };
        let body = format!(
            "Author: {} <{}>\nDate: {}\nParents: {}\n\n{}\n",
            commit.author,
            commit.author_email,
            commit.timestamp.to_rfc3339(),
            parents,
            commit.message.trim_end(),
        );
        self.sections.push(Section {
            source: SectionSource::Commit {
                sha: commit.sha.clone(),
            },
            body,
        });
    }

    /// Append a file section with arbitrary text
    pub fn push_file(&mut self, path: impl Into<String>, body: impl Into<String>) {
        self.sections.push(Section {
            source: SectionSource::File { path: path.into() },
            body: body.into(),
        });
    }

    /// Append a file section for a tree file
    pub fn push_tree_file(&mut self, file: TreeFile) {
        self.push_file(file.path, file.content);
    }

    /// Append a file section for a diff entry
    pub fn push_change(&mut self, change: &FileChange) {
        let mut body = format!("Change: {}\n", change.kind);
        if let Some(ref old) = change.old_path {
            body.push_str(&format!("Previous path: {old}\n"));
        }
        if let Some(ref patch) = change.patch {
            body.push('\n');
            body.push_str(patch);
        }
        self.push_file(change.path.clone(), body);
    }

    /// Record files that were left out
    pub fn record_skipped(&mut self, skipped: impl IntoIterator<Item = SkippedFile>) {
        self.skipped.extend(skipped);
    }

    /// Sections in order
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Source of every section, in order
    #[must_use]
    pub fn sources(&self) -> Vec<SectionSource> {
        self.sections.iter().map(|s| s.source.clone()).collect()
    }

    /// Files skipped while building
    #[must_use]
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Number of commit sections
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.sections.iter().filter(|s| s.source.is_commit()).count()
    }

    /// Set when a budget removed content
    #[must_use]
    pub fn truncation(&self) -> Option<&Truncation> {
        self.truncation.as_ref()
    }

    /// True when there are no sections
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    fn preamble_len(&self) -> usize {
        self.preamble
            .as_ref()
            .map_or(0, |p| p.len() + escaped_overhead(p) + 2)
    }

    /// Size of [`Artifact::render`] output in bytes
    #[must_use]
    pub fn rendered_len(&self) -> usize {
        self.preamble_len() + self.sections.iter().map(Section::rendered_len).sum::<usize>()
    }

    /// Rough token estimate for the rendered text (four bytes per token)
    #[must_use]
    pub fn estimated_tokens(&self) -> usize {
        self.rendered_len().div_ceil(4)
    }

    /// Concatenate all sections into one string
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.rendered_len());
        if let Some(ref preamble) = self.preamble {
            push_escaped(&mut out, preamble);
            out.push_str("\n\n");
        }
        for section in &self.sections {
            section.render_into(&mut out);
        }
        out
    }

    /// Write the rendered artifact to a flat file
    ///
    /// # Errors
    ///
    /// Returns `GitError::Io` if the file cannot be written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), GitError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        info!(path = %path.display(), bytes = self.rendered_len(), "Wrote artifact");
        Ok(())
    }

    /// Shrink the artifact to fit `budget`, dropping the oldest commits first
    ///
    /// Sections are grouped by commit: a commit header plus the file sections
    /// after it. Whole groups are removed from the end (the oldest commits,
    /// since walks are newest first). If the newest group alone is still too
    /// large its trailing file sections are removed. The first section is
    /// always kept.
    pub fn apply_budget(&mut self, budget: Budget) {
        let Some(max) = budget.max_bytes else {
            return;
        };
        let original_bytes = self.rendered_len();
        if original_bytes <= max {
            return;
        }

        let mut total = original_bytes;
        let mut dropped_sections = 0;
        let mut dropped_commits = 0;

        while total > max {
            let Some(start) = self.sections.iter().rposition(|s| s.source.is_commit()) else {
                break;
            };
            if start == 0 {
                break;
            }
            for section in self.sections.drain(start..) {
                total -= section.rendered_len();
                dropped_sections += 1;
            }
            dropped_commits += 1;
        }

        while total > max && self.sections.len() > 1 {
            if let Some(section) = self.sections.pop() {
                total -= section.rendered_len();
                dropped_sections += 1;
            }
        }

        warn!(
            original_bytes,
            max_bytes = max,
            final_bytes = total,
            dropped_sections,
            dropped_commits,
            "Artifact exceeded budget and was truncated"
        );
        self.truncation = Some(Truncation {
            dropped_sections,
            dropped_commits,
            original_bytes,
        });
    }
}

/// Split rendered text back into its section sources, in order
///
/// Only lines that look exactly like a delimiter count, so content lines such
/// as `--- a/src/lib.rs` in a unified diff are not mistaken for one. Body
/// lines shaped like a delimiter were escaped on render and are skipped too.
#[must_use]
pub fn parse_sources(text: &str) -> Vec<SectionSource> {
    text.lines().filter_map(SectionSource::parse_delimiter).collect()
}

/// Turns walks and trees into artifacts
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    mode: ContentMode,
    budget: Budget,
}

impl Aggregator {
    /// Aggregator for the given content mode, unbounded
    #[must_use]
    pub fn new(mode: ContentMode) -> Self {
        Self {
            mode,
            budget: Budget::unbounded(),
        }
    }

    /// Apply a size budget to every artifact produced
    #[must_use]
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    /// Content mode in use
    #[must_use]
    pub fn mode(&self) -> ContentMode {
        self.mode
    }

    /// Aggregate a history walk
    ///
    /// In `Snapshot` mode only the first (newest) commit is used.
    ///
    /// # Errors
    ///
    /// Propagates walk and tree/diff read errors. Unreadable individual files
    /// are recorded as skipped instead.
    pub fn aggregate_walk<'repo, I>(&self, walk: I) -> Result<Artifact, GitError>
    where
        I: IntoIterator<Item = Result<WalkedCommit<'repo>, GitError>>,
    {
        let mut artifact = Artifact::new();

        for walked in walk {
            let walked = walked?;
            artifact.push_commit(walked.commit());

            match self.mode {
                ContentMode::Snapshot | ContentMode::FullTree => {
                    let dump = walked.tree_files()?;
                    append_dump(&mut artifact, dump);
                }
                ContentMode::Diffs => {
                    if let Some(set) = walked.changes()? {
                        for change in &set.changes {
                            artifact.push_change(change);
                        }
                        artifact.record_skipped(set.skipped);
                    }
                }
            }

            if self.mode == ContentMode::Snapshot {
                break;
            }
        }

        Ok(self.finish(artifact))
    }

    /// Aggregate a single tree, e.g. the HEAD snapshot
    #[must_use]
    pub fn aggregate_tree(&self, commit: &Commit, dump: TreeDump) -> Artifact {
        let mut artifact = Artifact::new();
        artifact.push_commit(commit);
        append_dump(&mut artifact, dump);
        self.finish(artifact)
    }

    fn finish(&self, mut artifact: Artifact) -> Artifact {
        artifact.apply_budget(self.budget);
        info!(
            mode = %self.mode,
            commits = artifact.commit_count(),
            sections = artifact.sections().len(),
            skipped = artifact.skipped().len(),
            bytes = artifact.rendered_len(),
            "Aggregated artifact"
        );
        artifact
    }
}

fn append_dump(artifact: &mut Artifact, dump: TreeDump) {
    for file in dump.files {
        artifact.push_tree_file(file);
    }
    artifact.record_skipped(dump.skipped);
}
