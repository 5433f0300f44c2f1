// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Error types for analyst-mail

use thiserror::Error;

/// Errors that can occur while building or sending report email
#[derive(Debug, Error)]
pub enum MailError {
    /// A recipient or sender address did not parse
    #[error("Invalid email address {address:?}: {source}")]
    InvalidAddress {
        /// The rejected input
        address: String,
        /// Parser error
        #[source]
        source: lettre::address::AddressError,
    },

    /// The message could not be assembled
    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    /// The SMTP transport could not be configured
    #[error("SMTP configuration error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// Sending to one recipient failed
    #[error("Failed to send to {recipient}: {source}")]
    Send {
        /// Recipient address
        recipient: String,
        /// Whether the transport considered the failure temporary
        transient: bool,
        /// Transport error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No usable recipients were given
    #[error("No valid recipients")]
    NoRecipients,
}

impl MailError {
    /// Whether retrying the same send might succeed
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, MailError::Send { transient: true, .. })
    }
}
