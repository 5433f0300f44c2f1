// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Configuration for code-analyst
//!
//! Command-line flags and environment variables are read together through
//! clap. Secrets only come from the environment in practice; their values are
//! hidden from `--help` and redacted from `Debug` output.

use std::fmt;
use std::path::PathBuf;

use analyst_git::{Budget, ContentMode, Credentials, RepoRef};
use analyst_mail::{Mailbox, SmtpSettings, parse_recipients};
use analyst_report::PromptTemplate;
use analyst_report::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use clap::{Args, Parser, Subcommand};
use tracing::warn;

/// Code Analyst - periodic code-quality reports from repository history
#[derive(Parser, Debug, Clone)]
#[command(name = "code-analyst")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// What to do
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding local working copies
    ///
    /// Each repository is cloned into `<workdir>/<name>` on first use and
    /// reused afterwards without fetching.
    #[arg(long, env = "ANALYST_WORKDIR", default_value = "./repos", global = true)]
    pub workdir: PathBuf,

    /// Enable verbose logging (debug level)
    ///
    /// Logs are written to stderr so that stdout carries only the report.
    #[arg(short, long, default_value = "false", global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress info-level logs
    ///
    /// Only errors and warnings will be logged.
    #[arg(short, long, default_value = "false", global = true)]
    pub quiet: bool,

    /// Service endpoints and credentials, normally from the environment
    #[command(flatten)]
    pub services: ServiceSettings,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Extract recent history, generate a report and print it
    ///
    /// Example:
    ///   code-analyst analyze widgets --days 14 --email team@example.com
    Analyze(AnalyzeArgs),

    /// Extract recent history and emit the artifact without requesting a report
    Dump(DumpArgs),

    /// Run `analyze` periodically and email every report
    ///
    /// Runs until interrupted with Ctrl-C. A run that is in progress when the
    /// signal arrives is allowed to finish.
    Schedule(ScheduleArgs),
}

/// Which repository to read and how
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Repository URL, local path, or bare name under --owner
    pub repo: String,

    /// Account that owns a bare repository name (defaults to GITHUB_USERNAME)
    #[arg(long)]
    pub owner: Option<String>,

    /// Content per commit: snapshot, full-tree or diffs
    #[arg(long, default_value_t = ContentMode::Diffs)]
    pub mode: ContentMode,

    /// Size of the history window, in days ending now
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..))]
    pub days: u32,

    /// Upper bound on the artifact size in bytes; oldest commits are dropped first
    #[arg(long)]
    pub max_bytes: Option<usize>,

    /// Also write the aggregated artifact to this file
    #[arg(long)]
    pub artifact: Option<PathBuf>,

    /// Clone without credentials (public repositories and local paths)
    #[arg(long, default_value = "false")]
    pub no_auth: bool,
}

/// Arguments for `analyze`
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Prompt template: technical, stakeholder or weekly-digest
    #[arg(long, default_value_t = PromptTemplate::Technical)]
    pub template: PromptTemplate,

    /// Also write the report to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Comma-separated recipients to email the report to
    #[arg(long)]
    pub email: Option<String>,
}

/// Arguments for `dump`
#[derive(Args, Debug, Clone)]
pub struct DumpArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for `schedule`
#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Prompt template: technical, stakeholder or weekly-digest
    #[arg(long, default_value_t = PromptTemplate::WeeklyDigest)]
    pub template: PromptTemplate,

    /// Also write each report to this file, overwriting the previous one
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Comma-separated recipients to email every report to
    #[arg(long)]
    pub email: String,

    /// Hours between runs; the first run starts immediately
    #[arg(long, default_value_t = 168, value_parser = clap::value_parser!(u64).range(1..))]
    pub every_hours: u64,
}

/// A configuration value that must not appear in logs
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// The underlying value
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Endpoints and credentials for the services code-analyst talks to
#[derive(Args, Debug, Clone)]
pub struct ServiceSettings {
    /// API key for the report service
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, hide = true)]
    pub gemini_api_key: Option<Secret>,

    /// Report model name
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL, hide = true)]
    pub gemini_model: String,

    /// Report service base URL
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL, hide = true)]
    pub gemini_base_url: String,

    /// Account used to clone private repositories
    #[arg(long, env = "GITHUB_USERNAME", hide = true)]
    pub github_username: Option<String>,

    /// Access token used to clone private repositories
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, hide = true)]
    pub github_token: Option<Secret>,

    /// Sender address and SMTP login
    #[arg(long, env = "EMAIL_ADDRESS", hide = true)]
    pub email_address: Option<String>,

    /// SMTP password
    #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true, hide = true)]
    pub email_password: Option<Secret>,

    /// SMTP relay host
    #[arg(long, env = "SMTP_HOST", default_value = analyst_mail::DEFAULT_SMTP_HOST, hide = true)]
    pub smtp_host: String,

    /// SMTP relay port
    #[arg(long, env = "SMTP_PORT", default_value_t = analyst_mail::DEFAULT_SMTP_PORT, hide = true)]
    pub smtp_port: u16,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl ServiceSettings {
    /// Git credentials, when both parts are set
    #[must_use]
    pub fn github_credentials(&self) -> Option<Credentials> {
        let username = non_empty(self.github_username.as_deref())?;
        let token = non_empty(self.github_token.as_ref().map(Secret::expose))?;
        Some(Credentials::new(username, token))
    }

    /// Report service API key, when set
    #[must_use]
    pub fn gemini_api_key(&self) -> Option<&str> {
        non_empty(self.gemini_api_key.as_ref().map(Secret::expose))
    }

    /// SMTP settings, when login and password are set
    #[must_use]
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        let username = non_empty(self.email_address.as_deref())?;
        let password = non_empty(self.email_password.as_ref().map(Secret::expose))?;
        Some(SmtpSettings::new(username, password).with_relay(&self.smtp_host, self.smtp_port))
    }
}

impl Command {
    /// Repository arguments shared by every subcommand
    #[must_use]
    pub fn source(&self) -> &SourceArgs {
        match self {
            Command::Analyze(args) => &args.source,
            Command::Dump(args) => &args.source,
            Command::Schedule(args) => &args.source,
        }
    }

    /// Recipient list, if this subcommand sends email
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        match self {
            Command::Analyze(args) => args.email.as_deref(),
            Command::Dump(_) => None,
            Command::Schedule(args) => Some(&args.email),
        }
    }

    fn needs_report(&self) -> bool {
        !matches!(self, Command::Dump(_))
    }
}

impl SourceArgs {
    /// Size budget for the artifact
    #[must_use]
    pub fn budget(&self) -> Budget {
        self.max_bytes.map_or_else(Budget::unbounded, Budget::bytes)
    }
}

impl Config {
    /// Check that everything the chosen subcommand needs is present
    ///
    /// Runs before any network access so that a missing credential fails
    /// fast with every missing variable named at once.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - A bare repository name has no owner to expand against
    /// - The recipient list contains no valid address
    /// - The working-copy directory exists but is not a directory
    pub fn validate(&self) -> Result<(), ConfigError> {
        let source = self.command.source();
        let services = &self.services;
        let mut missing = Vec::new();

        if !source.no_auth {
            if non_empty(services.github_username.as_deref()).is_none() {
                missing.push("GITHUB_USERNAME");
            }
            if non_empty(services.github_token.as_ref().map(Secret::expose)).is_none() {
                missing.push("GITHUB_TOKEN");
            }
        }
        if self.command.needs_report() && services.gemini_api_key().is_none() {
            missing.push("GEMINI_API_KEY");
        }
        if self.command.email().is_some() {
            if non_empty(services.email_address.as_deref()).is_none() {
                missing.push("EMAIL_ADDRESS");
            }
            if non_empty(services.email_password.as_ref().map(Secret::expose)).is_none() {
                missing.push("EMAIL_PASSWORD");
            }
        }
        if !missing.is_empty() {
            return Err(ConfigError::CredentialsMissing { missing });
        }

        self.recipients()?;
        self.repo_ref()?;

        if self.workdir.exists() && !self.workdir.is_dir() {
            return Err(ConfigError::WorkdirNotDirectory(self.workdir.clone()));
        }

        Ok(())
    }

    /// Resolve the repository argument into a clone reference
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingOwner` for a bare name with neither
    /// `--owner` nor credentials.
    pub fn repo_ref(&self) -> Result<RepoRef, ConfigError> {
        let source = self.command.source();
        let credentials = if source.no_auth {
            None
        } else {
            self.services.github_credentials()
        };
        RepoRef::resolve(&source.repo, source.owner.as_deref(), credentials).ok_or_else(|| {
            ConfigError::MissingOwner {
                repo: source.repo.clone(),
            }
        })
    }

    /// Parsed recipients; empty when the subcommand sends no email
    ///
    /// Invalid entries are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoRecipients` if a list was given but nothing in
    /// it parsed.
    pub fn recipients(&self) -> Result<Vec<Mailbox>, ConfigError> {
        let Some(list) = self.command.email() else {
            return Ok(Vec::new());
        };
        let parsed = parse_recipients(list);
        for rejected in &parsed.rejected {
            warn!(error = %rejected, "Skipping invalid recipient");
        }
        if parsed.is_empty() {
            return Err(ConfigError::NoRecipients {
                list: list.to_string(),
            });
        }
        Ok(parsed.addresses)
    }

    /// Get the log level based on verbose/quiet flags
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::WARN
        } else {
            tracing::Level::INFO
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variables are unset or empty
    #[error("Missing required environment variables: {}", .missing.join(", "))]
    CredentialsMissing {
        /// Names of the missing variables
        missing: Vec<&'static str>,
    },

    /// A bare repository name cannot be expanded to a URL
    #[error("Cannot resolve repository {repo:?}: pass --owner or set GITHUB_USERNAME")]
    MissingOwner {
        /// The repository argument
        repo: String,
    },

    /// No valid address in the recipient list
    #[error("No valid email recipients in {list:?}")]
    NoRecipients {
        /// The list as given
        list: String,
    },

    /// Working-copy directory path is taken by a file
    #[error("Working copy directory is not a directory: {0}")]
    WorkdirNotDirectory(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["code-analyst"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).expect("parse should succeed")
    }

    fn with_all_secrets(mut config: Config) -> Config {
        config.services.gemini_api_key = Some(Secret::from("key".to_string()));
        config.services.github_username = Some("octocat".to_string());
        config.services.github_token = Some(Secret::from("ghp_token".to_string()));
        config.services.email_address = Some("reports@example.com".to_string());
        config.services.email_password = Some(Secret::from("pw".to_string()));
        config
    }

    fn clear_secrets(mut config: Config) -> Config {
        config.services.gemini_api_key = None;
        config.services.github_username = None;
        config.services.github_token = None;
        config.services.email_address = None;
        config.services.email_password = None;
        config
    }

    #[test]
    fn test_analyze_defaults() {
        let config = parse(&["analyze", "widgets"]);
        let Command::Analyze(ref args) = config.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.source.repo, "widgets");
        assert_eq!(args.source.mode, ContentMode::Diffs);
        assert_eq!(args.source.days, 7);
        assert_eq!(args.template, PromptTemplate::Technical);
        assert!(args.email.is_none());
        assert!(!args.source.no_auth);
    }

    #[test]
    fn test_schedule_defaults() {
        let config = parse(&["schedule", "widgets", "--email", "a@example.com"]);
        let Command::Schedule(ref args) = config.command else {
            panic!("expected schedule");
        };
        assert_eq!(args.every_hours, 168);
        assert_eq!(args.template, PromptTemplate::WeeklyDigest);
    }

    #[test]
    fn test_validate_names_every_missing_variable() {
        let config = clear_secrets(parse(&["analyze", "widgets", "--email", "a@example.com"]));
        match config.validate() {
            Err(ConfigError::CredentialsMissing { missing }) => assert_eq!(
                missing,
                vec![
                    "GITHUB_USERNAME",
                    "GITHUB_TOKEN",
                    "GEMINI_API_KEY",
                    "EMAIL_ADDRESS",
                    "EMAIL_PASSWORD"
                ]
            ),
            other => panic!("expected CredentialsMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_dump_without_auth_needs_nothing() {
        let config = clear_secrets(parse(&[
            "--workdir",
            "/nonexistent/code-analyst-workdir",
            "dump",
            "https://github.com/acme/widgets.git",
            "--no-auth",
        ]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let mut config = with_all_secrets(parse(&["analyze", "widgets"]));
        config.services.gemini_api_key = Some(Secret::from("  ".to_string()));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CredentialsMissing { missing }) if missing == vec!["GEMINI_API_KEY"]
        ));
    }

    #[test]
    fn test_bare_name_without_owner() {
        let config = clear_secrets(parse(&["dump", "widgets", "--no-auth"]));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingOwner { .. })
        ));
    }

    #[test]
    fn test_repo_ref_expands_bare_name_under_username() {
        let config = with_all_secrets(parse(&["analyze", "widgets"]));
        let reference = config.repo_ref().expect("resolve");
        assert_eq!(reference.url(), "https://github.com/octocat/widgets.git");
        assert!(reference.credentials().is_some());
    }

    #[test]
    fn test_no_auth_drops_credentials() {
        let config = with_all_secrets(parse(&["analyze", "widgets", "--owner", "acme", "--no-auth"]));
        let reference = config.repo_ref().expect("resolve");
        assert_eq!(reference.url(), "https://github.com/acme/widgets.git");
        assert!(reference.credentials().is_none());
    }

    #[test]
    fn test_recipients_all_invalid() {
        let config = with_all_secrets(parse(&["analyze", "widgets", "--email", "nope,also-nope"]));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NoRecipients { .. })
        ));
    }

    #[test]
    fn test_recipients_skip_invalid_entries() {
        let config = with_all_secrets(parse(&[
            "analyze",
            "widgets",
            "--email",
            "alice@example.com, nope ,bob@example.com",
        ]));
        let recipients = config.recipients().expect("recipients");
        let addresses: Vec<String> = recipients.iter().map(ToString::to_string).collect();
        assert_eq!(
            addresses,
            vec!["alice@example.com".to_string(), "bob@example.com".to_string()]
        );
    }

    #[test]
    fn test_workdir_that_is_a_file() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let mut config = with_all_secrets(parse(&["analyze", "widgets"]));
        config.workdir = file.path().to_path_buf();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WorkdirNotDirectory(_))
        ));
    }

    #[test]
    fn test_secrets_redacted_in_debug() {
        let config = with_all_secrets(parse(&["analyze", "widgets"]));
        let debug = format!("{config:?}");
        assert!(!debug.contains("ghp_token"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_smtp_settings_from_services() {
        let config = with_all_secrets(parse(&["analyze", "widgets"]));
        let smtp = config.services.smtp_settings().expect("smtp settings");
        assert_eq!(smtp.host, "smtp.gmail.com");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.username, "reports@example.com");
    }

    #[test]
    fn test_log_level() {
        assert_eq!(parse(&["dump", "x"]).log_level(), tracing::Level::INFO);
        assert_eq!(parse(&["-v", "dump", "x"]).log_level(), tracing::Level::DEBUG);
        assert_eq!(parse(&["dump", "x", "-q"]).log_level(), tracing::Level::WARN);
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Config::command().debug_assert();
    }
}
