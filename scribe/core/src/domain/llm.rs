// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Llm
//!
//! Streaming summary provider interface.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Anti-corruption layer between the summary pipeline and
//!   vendor text-generation APIs
//!
//! Two seams live here:
//!
//! - [`SummaryProvider`] is what the stream orchestrator drives. A conforming
//!   implementation resolves tenant credentials, retries whole attempts and
//!   normalizes fragments before they reach the caller.
//! - [`GenerationBackend`] is a single vendor attempt: open one streaming
//!   request and yield raw fragments. Implementations live in
//!   `infrastructure/llm/`.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::domain::tenant::TenantId;

/// Lazily produced text fragments. Nothing is buffered ahead of the consumer.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

pub const SYSTEM_INSTRUCTION_HTML: &str = "You are an assistant that produces concise, well-structured HTML. \
Return valid HTML fragments only, no code fences.";

pub const DEFAULT_SUMMARY_INSTRUCTION: &str = "Summarize the following HTML into concise, well-structured HTML paragraphs. \
Try to reduce the content to 40% of its original length, trying to keep the most important information.";

/// Per-request options of a summary stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Replaces [`DEFAULT_SUMMARY_INSTRUCTION`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,

    /// Replaces the configured stream timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// Fixed output for the mock backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mock_text: Option<String>,
}

impl SummaryOptions {
    pub fn build_prompt(&self, content_html: &str) -> String {
        let instruction = self
            .instruction
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .unwrap_or(DEFAULT_SUMMARY_INSTRUCTION);
        format!("{}\n\n{}", instruction, content_html)
    }
}

/// Domain interface for streamed summaries
pub trait SummaryProvider: Send + Sync {
    /// Stream a summary of `content_html` for `tenant`.
    ///
    /// `cancel` fires when the consumer goes away; implementations must stop
    /// waiting (including backoff sleeps) once it does.
    fn stream(
        &self,
        tenant: &TenantId,
        content_html: String,
        options: &SummaryOptions,
        cancel: CancellationToken,
    ) -> FragmentStream;
}

/// Credentials and model for one tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    pub api_key: String,
    pub model: String,
}

/// Everything one backend attempt needs
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    /// The document being summarized; `prompt` already embeds it
    pub content_html: String,
    pub system_instruction: String,
    pub credentials: ProviderCredentials,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub thinking_budget: u32,
    pub mock_text: Option<String>,
}

/// One streaming attempt against a vendor API
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short name for logs ("gemini", "openai", "mock")
    fn name(&self) -> &'static str;

    /// Model used when neither tenant secrets nor config name one
    fn default_model(&self) -> &'static str;

    /// Whether the backend needs an API key at all
    fn requires_api_key(&self) -> bool {
        true
    }

    /// Establish the stream. Errors returned here happen before any fragment.
    async fn open(&self, request: &GenerationRequest) -> Result<FragmentStream, ProviderError>;
}

/// Errors that can occur while producing a summary
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("No AI provider configuration for tenant '{0}'")]
    NotConfigured(TenantId),

    #[error("Unauthorized: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error: {0}")]
    Upstream(String),

    #[error("Stream failed after {attempts} attempt(s): {source}")]
    StreamFailed {
        attempts: u32,
        source: Box<ProviderError>,
    },

    #[error("Stream cancelled")]
    Cancelled,
}

impl ProviderError {
    /// The innermost error a `StreamFailed` wraps.
    pub fn root(&self) -> &ProviderError {
        match self {
            ProviderError::StreamFailed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let detail = format!("HTTP {}: {}", status.as_u16(), body);
        match status.as_u16() {
            401 | 403 => ProviderError::Authentication(detail),
            429 => ProviderError::RateLimit(detail),
            500..=599 | 408 => ProviderError::Unavailable(detail),
            _ => ProviderError::Upstream(detail),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ProviderError::Unavailable(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::from_status(status, err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}
