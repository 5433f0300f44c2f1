// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Integration tests for analyst-git
//!
//! These tests build real repositories on disk and run the accessor, walker
//! and aggregator against them.

mod common;

use analyst_git::{
    Aggregator, Budget, ContentMode, GitError, GitRepo, RepoAccessor, RepoRef, SectionSource,
    WalkOptions, parse_sources,
};
use chrono::{Duration, Utc};
use common::TestGitRepo;
use similar_asserts::assert_eq;
use std::collections::HashSet;

fn shas(repo: &GitRepo, options: &WalkOptions) -> Vec<String> {
    repo.walk(options)
        .expect("walk")
        .map(|c| c.expect("commit").commit().sha.clone())
        .collect()
}

/// Root commit a month ago, then three commits inside the last week that
/// each add two files.
fn weekly_fixture() -> (TestGitRepo, Vec<String>) {
    let fixture = TestGitRepo::new();
    fixture.write("README.md", "# Widgets\n");
    fixture.commit_days_ago("Initial commit", 30);

    let mut recent = Vec::new();
    for (i, days) in [5, 3, 1].into_iter().enumerate() {
        fixture.write(&format!("src/alpha_{i}.rs"), &format!("pub fn alpha_{i}() {{}}\n"));
        fixture.write(&format!("src/beta_{i}.rs"), &format!("pub fn beta_{i}() {{}}\n"));
        recent.push(fixture.commit_days_ago(&format!("Add module pair {i}"), days));
    }
    recent.reverse();
    (fixture, recent)
}

#[test]
fn test_weekly_diff_artifact_layout() {
    let (fixture, recent) = weekly_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");

    let walk = repo.walk(&WalkOptions::last_days(7)).expect("walk");
    let artifact = Aggregator::new(ContentMode::Diffs)
        .aggregate_walk(walk)
        .expect("aggregate");

    let mut expected = Vec::new();
    for (sha, i) in recent.iter().zip([2, 1, 0]) {
        expected.push(SectionSource::Commit { sha: sha.clone() });
        expected.push(SectionSource::File {
            path: format!("src/alpha_{i}.rs"),
        });
        expected.push(SectionSource::File {
            path: format!("src/beta_{i}.rs"),
        });
    }

    assert_eq!(artifact.sources(), expected);
    assert_eq!(artifact.commit_count(), 3);
    assert!(artifact.skipped().is_empty());
    assert_eq!(parse_sources(&artifact.render()), expected);
}

#[test]
fn test_diff_sections_carry_patches() {
    let (fixture, _) = weekly_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");

    let walk = repo.walk(&WalkOptions::last_days(7).limit(1)).expect("walk");
    let artifact = Aggregator::new(ContentMode::Diffs)
        .aggregate_walk(walk)
        .expect("aggregate");

    let text = artifact.render();
    assert!(text.contains("Change: added"));
    assert!(text.contains("+pub fn alpha_2() {}"));
}

#[test]
fn test_window_subsequence() {
    let (fixture, _) = weekly_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");

    let narrow = shas(&repo, &WalkOptions::last_days(4));
    let wide = shas(&repo, &WalkOptions::last_days(14));

    let mut wide_iter = wide.iter();
    for sha in &narrow {
        assert!(
            wide_iter.any(|w| w == sha),
            "{sha} from the narrow window is missing or out of order in the wide one"
        );
    }
    assert_eq!(narrow.len(), 2);
    assert_eq!(wide.len(), 3);
}

#[test]
fn test_full_history_yields_every_commit_once() {
    let (fixture, _) = weekly_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");

    let all = shas(&repo, &WalkOptions::all());
    let unique: HashSet<_> = all.iter().collect();

    assert_eq!(all.len(), 4);
    assert_eq!(unique.len(), 4);
    assert_eq!(repo.commit_count().expect("count"), 4);
}

#[test]
fn test_walk_is_newest_first() {
    let (fixture, _) = weekly_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");

    let timestamps: Vec<_> = repo
        .walk(&WalkOptions::all())
        .expect("walk")
        .map(|c| c.expect("commit").commit().timestamp)
        .collect();
    for pair in timestamps.windows(2) {
        assert!(pair[0] >= pair[1], "Commits should be ordered newest first");
    }
}

#[test]
fn test_empty_window_is_reported() {
    let (fixture, _) = weekly_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");

    let options = WalkOptions::all()
        .since(Utc::now() - Duration::days(60))
        .until(Utc::now() - Duration::days(45));
    assert!(matches!(
        repo.walk(&options),
        Err(GitError::EmptyHistory { .. })
    ));
}

#[test]
fn test_root_commit_has_header_only() {
    let fixture = TestGitRepo::new();
    fixture.write("a.txt", "a\n").write("b.txt", "b\n");
    let root = fixture.commit_days_ago("Root", 1);
    let repo = GitRepo::open(fixture.path()).expect("open");

    let walk = repo.walk(&WalkOptions::last_days(7)).expect("walk");
    let artifact = Aggregator::new(ContentMode::Diffs)
        .aggregate_walk(walk)
        .expect("aggregate");

    assert_eq!(artifact.sources(), vec![SectionSource::Commit { sha: root }]);
}

#[test]
fn test_binary_file_is_skipped_not_fatal() {
    let fixture = TestGitRepo::new();
    fixture
        .write("src/main.rs", "fn main() {}\n")
        .write("src/lib.rs", "pub mod util;\n")
        .write("Cargo.toml", "[package]\nname = \"demo\"\n")
        .write_bytes("assets/logo.png", &[0x89, b'P', b'N', b'G', 0, 0, 0, 13, 0xff]);
    fixture.commit_days_ago("Add sources and logo", 1);
    let repo = GitRepo::open(fixture.path()).expect("open");

    let (commit, dump) = repo.head_tree().expect("head tree");
    let artifact = Aggregator::new(ContentMode::Snapshot).aggregate_tree(&commit, dump);

    let files: Vec<_> = artifact
        .sources()
        .into_iter()
        .filter(|s| matches!(s, SectionSource::File { .. }))
        .collect();
    assert_eq!(files.len(), 3);
    assert_eq!(artifact.skipped().len(), 1);
    assert_eq!(artifact.skipped()[0].path, "assets/logo.png");
}

#[test]
fn test_full_tree_repeats_unchanged_files() {
    let fixture = TestGitRepo::new();
    fixture.write("stable.txt", "unchanged\n");
    fixture.commit_days_ago("First", 3);
    fixture.write("extra.txt", "new\n");
    fixture.commit_days_ago("Second", 2);
    let repo = GitRepo::open(fixture.path()).expect("open");

    let walk = repo.walk(&WalkOptions::last_days(7)).expect("walk");
    let artifact = Aggregator::new(ContentMode::FullTree)
        .aggregate_walk(walk)
        .expect("aggregate");

    let stable = SectionSource::File {
        path: "stable.txt".to_string(),
    };
    let occurrences = artifact.sources().iter().filter(|s| **s == stable).count();
    assert_eq!(occurrences, 2);
    assert_eq!(artifact.commit_count(), 2);
}

#[test]
fn test_snapshot_mode_uses_newest_commit_only() {
    let (fixture, recent) = weekly_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");

    let walk = repo.walk(&WalkOptions::last_days(7)).expect("walk");
    let artifact = Aggregator::new(ContentMode::Snapshot)
        .aggregate_walk(walk)
        .expect("aggregate");

    assert_eq!(artifact.commit_count(), 1);
    assert_eq!(
        artifact.sources()[0],
        SectionSource::Commit {
            sha: recent[0].clone()
        }
    );
    // README plus three module pairs
    assert_eq!(artifact.sections().len(), 1 + 7);
}

#[test]
fn test_budget_keeps_newest_commits() {
    let (fixture, recent) = weekly_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");

    let unbounded = Aggregator::new(ContentMode::Diffs)
        .aggregate_walk(repo.walk(&WalkOptions::last_days(7)).expect("walk"))
        .expect("aggregate");
    let budget = unbounded.rendered_len() - 1;

    let bounded = Aggregator::new(ContentMode::Diffs)
        .with_budget(Budget::bytes(budget))
        .aggregate_walk(repo.walk(&WalkOptions::last_days(7)).expect("walk"))
        .expect("aggregate");

    assert_eq!(bounded.commit_count(), 2);
    assert_eq!(
        bounded.sources()[0],
        SectionSource::Commit {
            sha: recent[0].clone()
        }
    );
    assert!(bounded.rendered_len() <= budget);
    assert_eq!(bounded.truncation().map(|t| t.dropped_commits), Some(1));
}

#[test]
fn test_clone_then_reuse_without_fetch() {
    let (fixture, recent) = weekly_fixture();
    let root = tempfile::tempdir().expect("tempdir");
    let accessor = RepoAccessor::new(root.path());
    let reference = RepoRef::from_url(fixture.path().display().to_string());

    let first = accessor.open_or_clone(&reference).expect("clone");
    assert!(first.freshly_cloned());
    assert_eq!(first.repo().head_sha().expect("head"), recent[0]);
    drop(first);

    // The remote moves on; the working copy must not follow
    fixture.write("later.txt", "later\n");
    let later = fixture.commit_days_ago("Later work", 0);

    let second = accessor.open_or_clone(&reference).expect("reuse");
    assert!(!second.freshly_cloned());
    assert_eq!(second.path(), accessor.target_path(&reference));
    let head = second.repo().head_sha().expect("head");
    assert_eq!(head, recent[0]);
    assert_ne!(head, later);
}

#[test]
fn test_artifact_written_to_file() {
    let (fixture, _) = weekly_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");
    let artifact = Aggregator::new(ContentMode::Diffs)
        .aggregate_walk(repo.walk(&WalkOptions::last_days(7)).expect("walk"))
        .expect("aggregate");

    let out = tempfile::tempdir().expect("tempdir");
    let path = out.path().join("reports").join("widgets_output.txt");
    artifact.write_to(&path).expect("write");

    let written = std::fs::read_to_string(&path).expect("read back");
    assert_eq!(written, artifact.render());
}

/// Files whose lines look like section delimiters, plus a diff that turns
/// `-- users ---` into the removed line `--- users ---`
fn delimiter_lookalike_fixture() -> TestGitRepo {
    let fixture = TestGitRepo::new();
    fixture.write(
        "schema.sql",
        "-- users ---\nCREATE TABLE users (id INTEGER);\n",
    );
    fixture.write("notes.md", "# Notes\n\n--- draft ---\n\n=== commit abc1234 ===\n");
    fixture.commit_days_ago("Add schema and notes", 3);
    fixture.write("schema.sql", "CREATE TABLE users (id INTEGER);\n");
    fixture.commit_days_ago("Drop schema banner", 1);
    fixture
}

#[test]
fn test_delimiter_lookalikes_do_not_split_sections() {
    let fixture = delimiter_lookalike_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");

    for mode in [ContentMode::Diffs, ContentMode::FullTree, ContentMode::Snapshot] {
        let walk = repo.walk(&WalkOptions::last_days(7)).expect("walk");
        let artifact = Aggregator::new(mode).aggregate_walk(walk).expect("aggregate");

        let text = artifact.render();
        assert_eq!(text.len(), artifact.rendered_len(), "{mode:?}");
        assert_eq!(parse_sources(&text), artifact.sources(), "{mode:?}");
    }
}

#[test]
fn test_removed_comment_line_in_diff_is_escaped() {
    let fixture = delimiter_lookalike_fixture();
    let repo = GitRepo::open(fixture.path()).expect("open");

    let walk = repo.walk(&WalkOptions::last_days(7).limit(1)).expect("walk");
    let artifact = Aggregator::new(ContentMode::Diffs)
        .aggregate_walk(walk)
        .expect("aggregate");

    let text = artifact.render();
    assert!(text.contains("\n\\--- users ---\n"));
    let files: Vec<SectionSource> = parse_sources(&text).into_iter().skip(1).collect();
    assert_eq!(
        files,
        vec![SectionSource::File {
            path: "schema.sql".to_string()
        }]
    );
}
