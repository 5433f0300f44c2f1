// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error type for the code-analyst pipeline

use analyst_git::GitError;
use analyst_mail::MailError;
use analyst_report::ReportError;
use thiserror::Error;

use crate::config::ConfigError;

/// Anything that can stop a pipeline run
#[derive(Debug, Error)]
pub enum AnalystError {
    /// Invalid or incomplete configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Repository access, walking or aggregation failed
    #[error(transparent)]
    Git(#[from] GitError),

    /// The report request failed
    #[error(transparent)]
    Report(#[from] ReportError),

    /// Email could not be prepared
    #[error(transparent)]
    Mail(#[from] MailError),

    /// Writing an output file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking git task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AnalystError {
    /// Whether retrying the failed step might succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            AnalystError::Git(e) => e.is_transient(),
            AnalystError::Report(e) => e.is_transient(),
            AnalystError::Mail(e) => e.is_transient(),
            AnalystError::Config(_) | AnalystError::Io(_) | AnalystError::Task(_) => false,
        }
    }
}
