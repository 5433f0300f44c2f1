// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! analyst-report: turn an aggregated repository artifact into a report
//!
//! This library crate renders prompt templates around the artifact text and
//! submits them to a generative text service. The [`ReportService`] trait is
//! the seam; [`GeminiClient`] is the production implementation.

#![warn(missing_docs)]

//! # Example
//!
//! ```no_run
//! use analyst_report::{GeminiClient, PromptTemplate, ReportService};
//!
//! # async fn run() -> Result<(), analyst_report::ReportError> {
//! let client = GeminiClient::new("api-key")?;
//! let prompt = PromptTemplate::Technical.render("widgets", "=== commit abc123 ===\n");
//! let report = client.generate(&prompt).await?;
//! println!("{}", report.text);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gemini;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::ReportError;
pub use gemini::{GeminiClient, GenerationSettings};
pub use prompt::PromptTemplate;

/// Token accounting reported alongside a generated report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt
    pub prompt_tokens: u32,
    /// Tokens produced in the report
    pub output_tokens: u32,
    /// Total billed tokens
    pub total_tokens: u32,
}

/// A generated report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Report body as returned by the service
    pub text: String,
    /// Token usage, when the service reports it
    pub usage: Option<TokenUsage>,
}

/// Something that can turn a prompt into a report
#[async_trait]
pub trait ReportService: Send + Sync {
    /// Submit `prompt` and wait for the report
    ///
    /// # Errors
    ///
    /// Returns `ReportError` on transport failure, a non-success status, or
    /// a response without text. Implementations do not retry.
    async fn generate(&self, prompt: &str) -> Result<Report, ReportError>;

    /// Tokens `prompt` would consume, if the service can tell ahead of time
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ReportService::generate`].
    async fn prompt_tokens(&self, _prompt: &str) -> Result<Option<u32>, ReportError> {
        Ok(None)
    }
}

#[async_trait]
impl<T: ReportService + ?Sized> ReportService for Box<T> {
    async fn generate(&self, prompt: &str) -> Result<Report, ReportError> {
        (**self).generate(prompt).await
    }

    async fn prompt_tokens(&self, prompt: &str) -> Result<Option<u32>, ReportError> {
        (**self).prompt_tokens(prompt).await
    }
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::ReportError;
    pub use crate::gemini::{GeminiClient, GenerationSettings};
    pub use crate::prompt::PromptTemplate;
    pub use crate::{Report, ReportService, TokenUsage};
}
