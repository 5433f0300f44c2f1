// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for analyst-report

use thiserror::Error;

/// Errors that can occur while requesting a report
#[derive(Debug, Error)]
pub enum ReportError {
    /// The service answered with a non-success status
    #[error("Report service returned {status}: {message}")]
    Provider {
        /// HTTP status code
        status: u16,
        /// Error message from the response body, or the raw body
        message: String,
    },

    /// Transport failure before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response carried no text, usually because it was blocked
    #[error("Report service returned no text (reason: {})", .reason.as_deref().unwrap_or("unknown"))]
    EmptyResponse {
        /// Finish or block reason reported by the service
        reason: Option<String>,
    },

    /// The response body did not match the expected shape
    #[error("Invalid response body: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl ReportError {
    /// Whether retrying the same request might succeed
    ///
    /// Rate limiting, server-side failures and transport errors qualify.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ReportError::Provider { status, .. } => *status == 429 || *status >= 500,
            ReportError::Http(e) => !e.is_builder() && !e.is_decode(),
            ReportError::EmptyResponse { .. } | ReportError::InvalidResponse(_) => false,
        }
    }
}
