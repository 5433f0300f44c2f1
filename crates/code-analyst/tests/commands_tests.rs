// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Integration tests for subcommand dispatch
//!
//! Only `dump` is driven end to end here; it needs no report service and no
//! mail server when pointed at a local repository with `--no-auth`.


use analyst_git::{Artifact, Budget, ContentMode, GitError, GitRepo};
use analyst_report::{Report, TokenUsage};
use chrono::Utc;
use clap::Parser;
use code_analyst::AnalystError;
use code_analyst::commands::{emit_artifact, execute, present};
use code_analyst::config::Config;
use code_analyst::pipeline::{ExtractRequest, Extraction, RunSummary, build_artifact};
use tempfile::TempDir;
use test_utils::TestGitRepo;

fn recent_repo() -> TestGitRepo {
    let repo = TestGitRepo::new();
    repo.create_file("src/lib.rs", "pub fn answer() -> u32 { 42 }\n")
        .commit_days_ago("Add answer", 2);
    repo
}

fn dump_config(repo: &TestGitRepo, workdir: &TempDir, extra: &[&str]) -> Config {
    let mut args = vec![
        "code-analyst".to_string(),
        "--workdir".to_string(),
        workdir.path().to_str().expect("utf-8 path").to_string(),
        "dump".to_string(),
        repo.path().to_str().expect("utf-8 path").to_string(),
        "--no-auth".to_string(),
    ];
    args.extend(extra.iter().map(ToString::to_string));
    Config::try_parse_from(args).expect("parse should succeed")
}

fn artifact_for(repo: &TestGitRepo) -> Artifact {
    let opened = GitRepo::open(repo.path()).expect("open");
    let until = Utc::now();
    let request = ExtractRequest {
        mode: ContentMode::Diffs,
        days: 7,
        budget: Budget::unbounded(),
    };
    build_artifact(
        &opened,
        "answers",
        request,
        until - chrono::Duration::days(7),
        until,
    )
    .expect("artifact")
}

fn summary(text: &str, artifact: Artifact) -> RunSummary {
    let until = Utc::now();
    RunSummary {
        extraction: Extraction {
            repo_name: "answers".to_string(),
            since: until - chrono::Duration::days(7),
            until,
            artifact,
            freshly_cloned: false,
        },
        report: Report {
            text: text.to_string(),
            usage: Some(TokenUsage {
                prompt_tokens: 120,
                output_tokens: 30,
                total_tokens: 150,
            }),
        },
        delivery: None,
    }
}

// ============================================================================
// dump
// ============================================================================

#[tokio::test]
async fn test_dump_writes_artifact_file() {
    let repo = recent_repo();
    let workdir = TempDir::new().expect("tempdir");
    let out = workdir.path().join("out").join("artifact.txt");
    let config = dump_config(
        &repo,
        &workdir,
        &["--artifact", out.to_str().expect("utf-8 path")],
    );

    execute(&config).await.expect("dump");

    let text = std::fs::read_to_string(&out).expect("artifact file");
    assert!(text.starts_with("Repository: "));
    assert!(text.contains("=== commit "));
    assert!(text.contains("--- src/lib.rs ---"));
}

#[tokio::test]
async fn test_dump_to_stdout() {
    let repo = recent_repo();
    let workdir = TempDir::new().expect("tempdir");
    let config = dump_config(&repo, &workdir, &[]);

    execute(&config).await.expect("dump");

    // The working copy was cloned even though nothing went to a file
    let entries = std::fs::read_dir(workdir.path()).expect("workdir").count();
    assert!(entries >= 1);
}

#[tokio::test]
async fn test_dump_empty_window() {
    let repo = TestGitRepo::new();
    repo.create_file("old.txt", "old\n")
        .commit_days_ago("Old work", 30);
    let workdir = TempDir::new().expect("tempdir");
    let config = dump_config(&repo, &workdir, &["--days", "7"]);

    let result = execute(&config).await;

    assert!(matches!(
        result,
        Err(AnalystError::Git(GitError::EmptyHistory { .. }))
    ));
}

// ============================================================================
// Output helpers
// ============================================================================

#[test]
fn test_emit_artifact_renders_to_writer() {
    let repo = recent_repo();
    let artifact = artifact_for(&repo);

    let mut out = Vec::new();
    emit_artifact(&artifact, None, &mut out).expect("emit");

    assert_eq!(String::from_utf8(out).expect("utf-8"), artifact.render());
}

#[test]
fn test_emit_artifact_prefers_path() {
    let repo = recent_repo();
    let artifact = artifact_for(&repo);
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("artifact.txt");

    let mut out = Vec::new();
    emit_artifact(&artifact, Some(&path), &mut out).expect("emit");

    assert!(out.is_empty());
    assert_eq!(
        std::fs::read_to_string(&path).expect("artifact file"),
        artifact.render()
    );
}

#[test]
fn test_present_prints_trimmed_report() {
    let mut artifact = artifact_for(&recent_repo());
    artifact.apply_budget(Budget::bytes(1));
    assert!(artifact.truncation().is_some());

    let mut out = Vec::new();
    present(&summary("## Findings\n\nAll quiet.\n\n\n", artifact), &mut out).expect("present");

    assert_eq!(
        String::from_utf8(out).expect("utf-8"),
        "## Findings\n\nAll quiet.\n"
    );
}
