// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Git repository scaffolding for analyst-git integration tests
//!
//! Fixture repositories are built with the `git` CLI so that commit dates can
//! be pinned through `GIT_AUTHOR_DATE` / `GIT_COMMITTER_DATE`.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// A throwaway git repository
pub struct TestGitRepo {
    dir: TempDir,
}

impl TestGitRepo {
    /// Initialize an empty repository with a test identity
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("analyst-git-test-")
            .tempdir()
            .expect("Failed to create temp dir");
        run_git(dir.path(), &["init", "--quiet"], None);
        run_git(dir.path(), &["config", "user.email", "test@example.com"], None);
        run_git(dir.path(), &["config", "user.name", "Test Author"], None);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"], None);
        Self { dir }
    }

    /// Path to the working tree
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a text file and stage it
    pub fn write(&self, relative_path: &str, content: &str) -> &Self {
        self.write_bytes(relative_path, content.as_bytes())
    }

    /// Write raw bytes and stage them
    pub fn write_bytes(&self, relative_path: &str, content: &[u8]) -> &Self {
        let file_path = self.dir.path().join(relative_path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&file_path, content).expect("Failed to write file");
        run_git(self.dir.path(), &["add", relative_path], None);
        self
    }

    /// Commit staged changes with both dates pinned to `when`
    pub fn commit_at(&self, message: &str, when: DateTime<Utc>) -> String {
        run_git(
            self.dir.path(),
            &["commit", "--quiet", "--allow-empty", "-m", message],
            Some(when),
        );
        self.head_sha()
    }

    /// Commit staged changes dated `days` days ago
    pub fn commit_days_ago(&self, message: &str, days: i64) -> String {
        self.commit_at(message, Utc::now() - Duration::days(days))
    }

    /// SHA of HEAD
    pub fn head_sha(&self) -> String {
        let output = Command::new("git")
            .current_dir(self.dir.path())
            .args(["rev-parse", "HEAD"])
            .output()
            .expect("Failed to get HEAD SHA");
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Owned copy of the path, for use as a clone source
    pub fn path_buf(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }
}

fn run_git(dir: &Path, args: &[&str], when: Option<DateTime<Utc>>) {
    let mut command = Command::new("git");
    command.current_dir(dir).args(args);
    if let Some(when) = when {
        let date = format!("@{} +0000", when.timestamp());
        command
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date);
    }

    let output = command.output().expect("Failed to run git command");
    if !output.status.success() {
        panic!(
            "Git command failed: git {}\nstderr: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}
