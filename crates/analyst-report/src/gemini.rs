// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Gemini `generateContent` client
//!
//! Requests go to `{base_url}/v1beta/models/{model}:generateContent` with the
//! API key in the `x-goog-api-key` header. The client never retries; callers
//! decide based on [`ReportError::is_transient`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ReportError;
use crate::{Report, ReportService, TokenUsage};

/// Public Gemini endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const API_KEY_HEADER: &str = "x-goog-api-key";
const RESPONSE_MIME_TYPE: &str = "text/plain";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling mass
    pub top_p: f32,
    /// Top-k sampling cutoff
    pub top_k: u32,
    /// Upper bound on generated tokens
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
        }
    }
}

// Wire format

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

impl<'a> RequestContent<'a> {
    fn user(text: &'a str) -> Self {
        Self {
            role: "user",
            parts: [RequestPart { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(flatten)]
    settings: GenerationSettings,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountTokensResponse {
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl From<UsageMetadata> for TokenUsage {
    fn from(usage: UsageMetadata) -> Self {
        Self {
            prompt_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        }
    }
}

impl GenerateResponse {
    fn into_report(self) -> Result<Report, ReportError> {
        let usage = self.usage_metadata.map(TokenUsage::from);
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(ReportError::EmptyResponse {
                reason: block_reason,
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ReportError::EmptyResponse {
                reason: candidate.finish_reason.or(block_reason),
            });
        }

        Ok(Report { text, usage })
    }
}

fn provider_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// HTTP client for the Gemini generative language API
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    settings: GenerationSettings,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("settings", &self.settings)
            .finish()
    }
}

impl GeminiClient {
    /// Create a client for the public endpoint with default settings
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Http` if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("code-analyst/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_http_client(api_key, http))
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_http_client(api_key: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            settings: GenerationSettings::default(),
        }
    }

    /// Point the client at a different host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a different model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override sampling parameters
    #[must_use]
    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Configured model name
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Configured sampling parameters
    #[must_use]
    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }

    /// Ask the service how many tokens `prompt` would consume
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ReportService::generate`], minus
    /// `EmptyResponse`.
    pub async fn count_tokens(&self, prompt: &str) -> Result<u32, ReportError> {
        let request = CountTokensRequest {
            contents: [RequestContent::user(prompt)],
        };
        let response: CountTokensResponse = self.post("countTokens", &request).await?;
        debug!(tokens = response.total_tokens, "Counted prompt tokens");
        Ok(response.total_tokens)
    }

    async fn post<B, R>(&self, method: &str, body: &B) -> Result<R, ReportError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(method);
        debug!(%url, "Sending request");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = provider_message(&text);
            warn!(status = status.as_u16(), %message, "Report service rejected request");
            return Err(ReportError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ReportService for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Report, ReportError> {
        let request = GenerateRequest {
            contents: [RequestContent::user(prompt)],
            generation_config: GenerationConfig {
                settings: self.settings,
                response_mime_type: RESPONSE_MIME_TYPE,
            },
        };

        info!(model = %self.model, prompt_bytes = prompt.len(), "Requesting report");
        let response: GenerateResponse = self.post("generateContent", &request).await?;
        let report = response.into_report()?;

        if let Some(usage) = report.usage {
            info!(
                prompt_tokens = usage.prompt_tokens,
                output_tokens = usage.output_tokens,
                "Report generated"
            );
        }
        Ok(report)
    }

    async fn prompt_tokens(&self, prompt: &str) -> Result<Option<u32>, ReportError> {
        self.count_tokens(prompt).await.map(Some)
    }
}
