// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Repository references
//!
//! A [`RepoRef`] is what the user typed, resolved to a clone URL plus the
//! credentials used to fetch it. Credentials are handed to git2 through a
//! callback and never spliced into the URL.

use std::fmt;
use std::path::Path;

/// Host used when the user gives a bare repository name
pub const DEFAULT_HOST: &str = "https://github.com";

/// HTTPS credentials for a remote
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account name
    pub username: String,
    /// Access token or password
    pub token: String,
}

impl Credentials {
    /// Create credentials from a username and token
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// A remote repository plus optional credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    url: String,
    credentials: Option<Credentials>,
}

impl RepoRef {
    /// Reference a repository by URL or local path, used verbatim
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
        }
    }

    /// Resolve user input into a reference
    ///
    /// URLs (`https://`, `http://`, `ssh://`, `file://`, `git@host:`) and
    /// existing local paths are used as-is. Anything else is treated as a
    /// repository name under `owner` on [`DEFAULT_HOST`]; with no owner the
    /// credential username is used. Returns `None` if a bare name has no
    /// owner to expand against.
    #[must_use]
    pub fn resolve(input: &str, owner: Option<&str>, credentials: Option<Credentials>) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        let url = if is_url(input) || Path::new(input).exists() {
            input.to_string()
        } else {
            let owner = owner
                .map(str::to_string)
                .or_else(|| credentials.as_ref().map(|c| c.username.clone()))?;
            let name = input.trim_end_matches('/');
            let name = name.strip_suffix(".git").unwrap_or(name);
            format!("{DEFAULT_HOST}/{owner}/{name}.git")
        };

        Some(Self { url, credentials })
    }

    /// Attach credentials
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// The clone URL (never contains the token)
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Credentials, if any
    #[must_use]
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Name of the local working-copy directory
    ///
    /// The last path segment of the URL with any trailing `/` and `.git`
    /// suffix removed. `git@host:owner/repo.git` style URLs split on `:` too.
    #[must_use]
    pub fn local_name(&self) -> String {
        let trimmed = self.url.trim_end_matches(['/', '\\']);
        let last = trimmed
            .rsplit(['/', '\\', ':'])
            .next()
            .unwrap_or(trimmed);
        let name = last.strip_suffix(".git").unwrap_or(last);
        if name.is_empty() {
            "repository".to_string()
        } else {
            name.to_string()
        }
    }
}

fn is_url(input: &str) -> bool {
    ["https://", "http://", "ssh://", "git://", "file://"]
        .iter()
        .any(|scheme| input.starts_with(scheme))
        || (input.starts_with("git@") && input.contains(':'))
}
