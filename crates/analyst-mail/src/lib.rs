// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! analyst-mail: email delivery for generated reports
//!
//! Reports are sent as plain text, one message per recipient, over any
//! `lettre` async transport. [`ReportMailer::smtp`] builds the SMTP-backed
//! mailer used in production.

#![warn(missing_docs)]

//! # Example
//!
//! ```no_run
//! use analyst_mail::{ReportMailer, SmtpSettings, parse_recipients};
//!
//! # async fn run() -> Result<(), analyst_mail::MailError> {
//! let settings = SmtpSettings::new("reports@example.com", "app-password");
//! let mailer = ReportMailer::smtp(&settings)?;
//! let recipients = parse_recipients("alice@example.com,bob@example.com");
//! let summary = mailer
//!     .deliver(&recipients.addresses, "widgets : 2024-06-03 - 2024-06-10", "All quiet.")
//!     .await?;
//! println!("delivered to {}", summary.delivered.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod mailer;

pub use error::MailError;
pub use lettre::message::Mailbox;
pub use lettre::AsyncTransport;
pub use mailer::{
    DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT, DeliverySummary, Recipients, ReportMailer, SendFailure,
    SmtpSettings, SmtpTransport, parse_recipients, report_subject,
};
