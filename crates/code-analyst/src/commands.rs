// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Subcommand dispatch

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use analyst_git::{Artifact, RepoAccessor};
use analyst_mail::{ReportMailer, SmtpTransport};
use analyst_report::GeminiClient;
use tracing::{error, info, warn};

use crate::config::{Command, Config, ConfigError, SourceArgs};
use crate::error::AnalystError;
use crate::pipeline::{ExtractRequest, Pipeline, ReportJob, RunSummary, extract};
use crate::retry::RetryPolicy;
use crate::schedule::run_periodically;

type ProductionPipeline = Pipeline<GeminiClient, SmtpTransport>;

/// Run the subcommand selected in `config`
///
/// `config` is expected to have passed [`Config::validate`].
///
/// # Errors
///
/// Returns the first error that stops the subcommand. For `schedule`, only
/// setup errors are returned; failed runs are logged.
pub async fn execute(config: &Config) -> Result<(), AnalystError> {
    match &config.command {
        Command::Dump(args) => dump(config, &args.source).await,
        Command::Analyze(args) => {
            let pipeline = build_pipeline(config, &args.source)?;
            let job = ReportJob {
                template: args.template,
                artifact_path: args.source.artifact.clone(),
                output_path: args.output.clone(),
                recipients: config.recipients()?,
            };
            let summary = pipeline.run(&job).await?;
            present(&summary, &mut std::io::stdout().lock())
        }
        Command::Schedule(args) => {
            let pipeline = build_pipeline(config, &args.source)?;
            let job = ReportJob {
                template: args.template,
                artifact_path: args.source.artifact.clone(),
                output_path: args.output.clone(),
                recipients: config.recipients()?,
            };
            let period = Duration::from_secs(args.every_hours.saturating_mul(3600));
            info!(
                repo = %args.source.repo,
                every_hours = args.every_hours,
                recipients = job.recipients.len(),
                "Starting scheduler; press Ctrl-C to stop"
            );

            run_periodically(
                period,
                || async {
                    let summary = pipeline.run(&job).await?;
                    present(&summary, &mut std::io::stdout().lock())
                },
                shutdown_signal(),
            )
            .await;
            Ok(())
        }
    }
}

fn extract_request(source: &SourceArgs) -> ExtractRequest {
    ExtractRequest {
        mode: source.mode,
        days: source.days,
        budget: source.budget(),
    }
}

async fn dump(config: &Config, source: &SourceArgs) -> Result<(), AnalystError> {
    let accessor = RepoAccessor::new(&config.workdir);
    let reference = config.repo_ref()?;
    let extraction = extract(
        &accessor,
        &reference,
        extract_request(source),
        &RetryPolicy::default(),
    )
    .await?;

    emit_artifact(
        &extraction.artifact,
        source.artifact.as_deref(),
        &mut std::io::stdout().lock(),
    )
}

/// Write `artifact` to `path`, or render it to `out` when no path is given
///
/// # Errors
///
/// Returns `AnalystError::Git` if the artifact file cannot be written, or
/// `AnalystError::Io` if `out` fails.
pub fn emit_artifact<W: Write>(
    artifact: &Artifact,
    path: Option<&Path>,
    out: &mut W,
) -> Result<(), AnalystError> {
    match path {
        Some(path) => artifact.write_to(path)?,
        None => {
            out.write_all(artifact.render().as_bytes())?;
            out.flush()?;
        }
    }
    Ok(())
}

fn build_pipeline(config: &Config, source: &SourceArgs) -> Result<ProductionPipeline, AnalystError> {
    let services = &config.services;
    let api_key = services
        .gemini_api_key()
        .ok_or(ConfigError::CredentialsMissing {
            missing: vec!["GEMINI_API_KEY"],
        })?;
    let client = GeminiClient::new(api_key)?
        .with_base_url(&services.gemini_base_url)
        .with_model(&services.gemini_model);

    let mut pipeline = Pipeline::new(
        RepoAccessor::new(&config.workdir),
        config.repo_ref()?,
        extract_request(source),
        client,
    );

    if config.command.email().is_some() {
        let settings = services
            .smtp_settings()
            .ok_or(ConfigError::CredentialsMissing {
                missing: vec!["EMAIL_ADDRESS", "EMAIL_PASSWORD"],
            })?;
        pipeline = pipeline.with_mailer(ReportMailer::smtp(&settings)?);
    }

    Ok(pipeline)
}

/// Print the report to `out` and log what happened around it
///
/// # Errors
///
/// Returns `AnalystError::Io` if writing fails.
pub fn present<W: Write>(summary: &RunSummary, out: &mut W) -> Result<(), AnalystError> {
    let artifact = &summary.extraction.artifact;
    if let Some(truncation) = artifact.truncation() {
        warn!(
            dropped_commits = truncation.dropped_commits,
            dropped_sections = truncation.dropped_sections,
            "Report covers a truncated artifact"
        );
    }
    if let Some(usage) = summary.report.usage {
        info!(
            prompt_tokens = usage.prompt_tokens,
            output_tokens = usage.output_tokens,
            "Token usage"
        );
    }
    if let Some(ref delivery) = summary.delivery {
        info!(
            delivered = delivery.delivered.len(),
            failed = delivery.failed.len(),
            "Email delivery finished"
        );
    }

    writeln!(out, "{}", summary.report.text.trim_end())?;
    out.flush()?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl-C; scheduler will run until killed");
        std::future::pending::<()>().await;
    }
}
