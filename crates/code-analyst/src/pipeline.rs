// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! The extract, report and deliver pipeline
//!
//! Steps run strictly one after another. Git work happens on the blocking
//! pool and is awaited straight away.

use std::path::{Path, PathBuf};

use analyst_git::{
    Aggregator, Artifact, Budget, ContentMode, GitError, GitRepo, RepoAccessor, RepoRef,
    WalkOptions,
};
use analyst_mail::{
    AsyncTransport, DeliverySummary, Mailbox, ReportMailer, SendFailure, report_subject,
};
use analyst_report::{PromptTemplate, Report, ReportService};
use chrono::{DateTime, Duration, Utc};
use tokio::task;
use tracing::{info, warn};

use crate::error::AnalystError;
use crate::retry::RetryPolicy;

/// What to extract from a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Content per commit
    pub mode: ContentMode,
    /// Window length in days, ending now
    pub days: u32,
    /// Artifact size budget
    pub budget: Budget,
}

/// The result of extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Local working-copy name, also used as the repository name in reports
    pub repo_name: String,
    /// Start of the history window
    pub since: DateTime<Utc>,
    /// End of the history window
    pub until: DateTime<Utc>,
    /// The aggregated artifact
    pub artifact: Artifact,
    /// Whether this run cloned the repository
    pub freshly_cloned: bool,
}

/// Build the artifact for an opened repository
///
/// Snapshot mode reads the HEAD tree regardless of the window. The other
/// modes walk commits inside `since..=until` and fail with
/// `GitError::EmptyHistory` when there are none.
///
/// # Errors
///
/// Propagates walk, tree and diff errors.
pub fn build_artifact(
    repo: &GitRepo,
    repo_name: &str,
    request: ExtractRequest,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Artifact, GitError> {
    let preamble = format!(
        "Repository: {repo_name}\nWindow: {} - {}\nMode: {}\nTotal commits: {}",
        since.format("%Y-%m-%d"),
        until.format("%Y-%m-%d"),
        request.mode,
        repo.commit_count()?
    );

    // The preamble counts against the budget too
    let budget = match request.budget.max_bytes {
        Some(max) => Budget::bytes(max.saturating_sub(preamble.len() + 2)),
        None => Budget::unbounded(),
    };
    let aggregator = Aggregator::new(request.mode).with_budget(budget);

    let artifact = match request.mode {
        ContentMode::Snapshot => {
            let (commit, dump) = repo.head_tree()?;
            aggregator.aggregate_tree(&commit, dump)
        }
        ContentMode::FullTree | ContentMode::Diffs => {
            let walk = repo.walk(&WalkOptions::all().since(since).until(until))?;
            aggregator.aggregate_walk(walk)?
        }
    };

    for skipped in artifact.skipped() {
        warn!(path = %skipped.path, commit = %skipped.commit, reason = %skipped.reason, "Skipped file");
    }

    Ok(artifact.with_preamble(preamble))
}

/// Clone or reuse the working copy and build the artifact
///
/// The clone is retried on transient failures; extraction is not.
///
/// # Errors
///
/// Returns `AnalystError::Git` for clone, lock and walk failures.
pub async fn extract(
    accessor: &RepoAccessor,
    reference: &RepoRef,
    request: ExtractRequest,
    retry: &RetryPolicy,
) -> Result<Extraction, AnalystError> {
    let checkout = retry
        .run("clone", || {
            let accessor = accessor.clone();
            let reference = reference.clone();
            async move {
                let checkout = task::spawn_blocking(move || accessor.open_or_clone(&reference)).await??;
                Ok::<_, AnalystError>(checkout)
            }
        })
        .await?;

    let freshly_cloned = checkout.freshly_cloned();
    let repo_name = reference.local_name();
    let until = Utc::now();
    let since = until - Duration::days(i64::from(request.days));

    let name = repo_name.clone();
    let artifact = task::spawn_blocking(move || {
        build_artifact(checkout.repo(), &name, request, since, until)
    })
    .await??;

    info!(
        repo = %repo_name,
        commits = artifact.commit_count(),
        estimated_tokens = artifact.estimated_tokens(),
        "Extraction complete"
    );

    Ok(Extraction {
        repo_name,
        since,
        until,
        artifact,
        freshly_cloned,
    })
}

/// Everything a full run needs besides the repository
#[derive(Debug, Clone)]
pub struct ReportJob {
    /// Prompt template
    pub template: PromptTemplate,
    /// Write the artifact here as well
    pub artifact_path: Option<PathBuf>,
    /// Write the report here as well
    pub output_path: Option<PathBuf>,
    /// Email the report to these recipients
    pub recipients: Vec<Mailbox>,
}

/// Outcome of a full run
#[derive(Debug)]
pub struct RunSummary {
    /// What was extracted
    pub extraction: Extraction,
    /// The generated report
    pub report: Report,
    /// Per-recipient delivery results, when email was requested
    pub delivery: Option<DeliverySummary>,
}

/// Runs extraction, report generation and delivery
pub struct Pipeline<S, T> {
    accessor: RepoAccessor,
    reference: RepoRef,
    extract: ExtractRequest,
    service: S,
    mailer: Option<ReportMailer<T>>,
    retry: RetryPolicy,
}

impl<S, T> Pipeline<S, T>
where
    S: ReportService,
    T: AsyncTransport + Send + Sync,
    T::Error: SendFailure,
{
    /// Pipeline for one repository
    pub fn new(accessor: RepoAccessor, reference: RepoRef, extract: ExtractRequest, service: S) -> Self {
        Self {
            accessor,
            reference,
            extract,
            service,
            mailer: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Enable email delivery
    #[must_use]
    pub fn with_mailer(mut self, mailer: ReportMailer<T>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// The report service
    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    /// The configured mailer, if any
    #[must_use]
    pub fn mailer(&self) -> Option<&ReportMailer<T>> {
        self.mailer.as_ref()
    }

    /// Override the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Run every step once
    ///
    /// Delivery failures are recorded in the summary and do not fail the run.
    ///
    /// # Errors
    ///
    /// Returns the first extraction, report or file-writing error.
    pub async fn run(&self, job: &ReportJob) -> Result<RunSummary, AnalystError> {
        let extraction = extract(&self.accessor, &self.reference, self.extract, &self.retry).await?;

        if let Some(ref path) = job.artifact_path {
            extraction.artifact.write_to(path)?;
        }

        let prompt = job
            .template
            .render(&extraction.repo_name, &extraction.artifact.render());

        // Counting is advisory; the prompt is sent either way
        match self.service.prompt_tokens(&prompt).await {
            Ok(Some(tokens)) => info!(
                prompt_tokens = tokens,
                estimated_tokens = extraction.artifact.estimated_tokens(),
                "Counted prompt tokens"
            ),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Could not count prompt tokens"),
        }

        let report = self
            .retry
            .run("report", || async {
                self.service
                    .generate(&prompt)
                    .await
                    .map_err(AnalystError::from)
            })
            .await?;

        if let Some(ref path) = job.output_path {
            write_report(path, &report.text)?;
        }

        let delivery = match self.mailer {
            Some(ref mailer) if !job.recipients.is_empty() => {
                let subject =
                    report_subject(&extraction.repo_name, &extraction.since, &extraction.until);
                Some(deliver(mailer, &job.recipients, &subject, &report.text, &self.retry).await)
            }
            _ => None,
        };

        Ok(RunSummary {
            extraction,
            report,
            delivery,
        })
    }
}

/// Send `body` to every recipient, retrying each transient failure
pub async fn deliver<T>(
    mailer: &ReportMailer<T>,
    recipients: &[Mailbox],
    subject: &str,
    body: &str,
    retry: &RetryPolicy,
) -> DeliverySummary
where
    T: AsyncTransport + Send + Sync,
    T::Error: SendFailure,
{
    let mut summary = DeliverySummary::default();
    for recipient in recipients {
        let outcome = retry
            .run("email", || mailer.send_to(recipient, subject, body))
            .await;
        summary.record(recipient, outcome);
    }
    summary
}

fn write_report(path: &Path, text: &str) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    info!(path = %path.display(), "Wrote report");
    Ok(())
}
