// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Bounded retry with exponential backoff
//!
//! Only errors that classify themselves as transient are retried.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use analyst_git::GitError;
use analyst_mail::MailError;
use analyst_report::ReportError;
use tracing::warn;

use crate::error::AnalystError;

/// Errors that can say whether a retry might help
pub trait Transient {
    /// Whether the failure is expected to clear on its own
    fn is_transient(&self) -> bool;
}

impl Transient for GitError {
    fn is_transient(&self) -> bool {
        GitError::is_transient(self)
    }
}

impl Transient for ReportError {
    fn is_transient(&self) -> bool {
        ReportError::is_transient(self)
    }
}

impl Transient for MailError {
    fn is_transient(&self) -> bool {
        MailError::is_transient(self)
    }
}

impl Transient for AnalystError {
    fn is_transient(&self) -> bool {
        AnalystError::is_transient(self)
    }
}

/// How often and how patiently to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Delay after the given failed attempt (1-based)
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    ///
    /// # Errors
    ///
    /// Returns the last error from `op`.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
