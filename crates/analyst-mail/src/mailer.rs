// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Report mailer
//!
//! A failed recipient never aborts the others; every outcome lands in the
//! [`DeliverySummary`].

use chrono::{DateTime, TimeZone};
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::fmt;
use tracing::{info, warn};

use crate::error::MailError;

/// Default SMTP relay
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default submission port (STARTTLS)
pub const DEFAULT_SMTP_PORT: u16 = 587;

const IMPLICIT_TLS_PORT: u16 = 465;

/// Transport used by [`ReportMailer::smtp`]
pub type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

/// SMTP relay settings
#[derive(Clone)]
pub struct SmtpSettings {
    /// Relay host name
    pub host: String,
    /// Relay port; 465 selects implicit TLS, anything else STARTTLS
    pub port: u16,
    /// Login user
    pub username: String,
    /// Login password or app password
    pub password: String,
    /// Sender address; defaults to `username`
    pub from: Option<String>,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

impl SmtpSettings {
    /// Settings for the default relay with the given login
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            username: username.into(),
            password: password.into(),
            from: None,
        }
    }

    /// Use a different relay
    #[must_use]
    pub fn with_relay(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Send as a different address than the login
    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// The sender mailbox
    ///
    /// # Errors
    ///
    /// Returns `MailError::InvalidAddress` if the sender does not parse.
    pub fn sender(&self) -> Result<Mailbox, MailError> {
        parse_address(self.from.as_deref().unwrap_or(&self.username))
    }
}

/// Recipients parsed from a comma-separated list
#[derive(Debug, Default)]
pub struct Recipients {
    /// Addresses that parsed
    pub addresses: Vec<Mailbox>,
    /// One `MailError::InvalidAddress` per rejected entry
    pub rejected: Vec<MailError>,
}

impl Recipients {
    /// Whether nothing usable was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

fn parse_address(input: &str) -> Result<Mailbox, MailError> {
    input
        .trim()
        .parse::<Mailbox>()
        .map_err(|source| MailError::InvalidAddress {
            address: input.trim().to_string(),
            source,
        })
}

/// Split `list` on commas and parse each entry
///
/// Blank entries are ignored. Invalid entries are returned in
/// [`Recipients::rejected`] rather than failing the whole list; reporting
/// them is up to the caller.
#[must_use]
pub fn parse_recipients(list: &str) -> Recipients {
    let mut recipients = Recipients::default();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match parse_address(entry) {
            Ok(mailbox) => recipients.addresses.push(mailbox),
            Err(e) => recipients.rejected.push(e),
        }
    }
    recipients
}

/// Subject line for a report covering `since..=until`
pub fn report_subject<Tz: TimeZone>(repo_name: &str, since: &DateTime<Tz>, until: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    format!(
        "{repo_name} : {} - {}",
        since.format("%Y-%m-%d"),
        until.format("%Y-%m-%d")
    )
}

/// Per-recipient outcome of a delivery
#[derive(Debug, Default)]
pub struct DeliverySummary {
    /// Recipients the transport accepted
    pub delivered: Vec<String>,
    /// Recipients that failed, with the final error
    pub failed: Vec<(String, MailError)>,
}

impl DeliverySummary {
    /// Record the outcome for one recipient
    pub fn record(&mut self, recipient: &Mailbox, outcome: Result<(), MailError>) {
        let address = recipient.email.to_string();
        match outcome {
            Ok(()) => {
                info!(recipient = %address, "Report delivered");
                self.delivered.push(address);
            }
            Err(e) => {
                warn!(recipient = %address, error = %e, "Report delivery failed");
                self.failed.push((address, e));
            }
        }
    }

    /// Whether every recipient was reached
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Classifies transport errors for retry decisions
pub trait SendFailure: std::error::Error + Send + Sync + 'static {
    /// Whether the failure is expected to clear on its own
    fn is_transient(&self) -> bool {
        false
    }
}

impl SendFailure for lettre::transport::smtp::Error {
    fn is_transient(&self) -> bool {
        lettre::transport::smtp::Error::is_transient(self) || self.is_timeout()
    }
}

impl SendFailure for lettre::transport::stub::Error {}

/// Sends report bodies as plain-text email
pub struct ReportMailer<T> {
    transport: T,
    from: Mailbox,
}

impl ReportMailer<SmtpTransport> {
    /// Mailer backed by an SMTP relay
    ///
    /// No connection is made until the first send.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Smtp` for an unusable relay configuration and
    /// `MailError::InvalidAddress` for a bad sender.
    pub fn smtp(settings: &SmtpSettings) -> Result<Self, MailError> {
        let builder = if settings.port == IMPLICIT_TLS_PORT {
            SmtpTransport::relay(&settings.host)?
        } else {
            SmtpTransport::starttls_relay(&settings.host)?
        };
        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();
        Ok(Self::new(transport, settings.sender()?))
    }
}

impl<T> ReportMailer<T>
where
    T: AsyncTransport + Send + Sync,
    T::Error: SendFailure,
{
    /// Mailer over any async transport
    pub fn new(transport: T, from: Mailbox) -> Self {
        Self { transport, from }
    }

    /// Sender mailbox
    #[must_use]
    pub fn from(&self) -> &Mailbox {
        &self.from
    }

    /// The underlying transport
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one message to one recipient
    ///
    /// # Errors
    ///
    /// `MailError::Build` if the message cannot be assembled,
    /// `MailError::Send` if the transport rejects it.
    pub async fn send_to(&self, recipient: &Mailbox, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(recipient.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| MailError::Send {
                recipient: recipient.email.to_string(),
                transient: e.is_transient(),
                source: Box::new(e),
            })
    }

    /// Send the report to every recipient, one message each
    ///
    /// # Errors
    ///
    /// Returns `MailError::NoRecipients` when `recipients` is empty.
    /// Per-recipient failures are collected in the summary instead.
    pub async fn deliver(
        &self,
        recipients: &[Mailbox],
        subject: &str,
        body: &str,
    ) -> Result<DeliverySummary, MailError> {
        if recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut summary = DeliverySummary::default();
        for recipient in recipients {
            let outcome = self.send_to(recipient, subject, body).await;
            summary.record(recipient, outcome);
        }
        Ok(summary)
    }
}
