// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI LLM Provider Adapter
//
// Anti-Corruption Layer for the OpenAI chat completions API in streaming mode.
// Also works with OpenAI-compatible APIs (LM Studio, vLLM, etc.)

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::sse;
use crate::domain::llm::{FragmentStream, GenerationBackend, GenerationRequest, ProviderError};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const DONE_MARKER: &str = "[DONE]";

pub struct OpenAIAdapter {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAIChunk {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    delta: OpenAIDelta,
}

#[derive(Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

impl OpenAIAdapter {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }
}

fn delta_text(payload: &str) -> Result<Option<String>, ProviderError> {
    let chunk: OpenAIChunk = serde_json::from_str(payload)
        .map_err(|e| ProviderError::Upstream(format!("Failed to parse stream chunk: {}", e)))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .filter(|text| !text.is_empty()))
}

#[async_trait]
impl GenerationBackend for OpenAIAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn default_model(&self) -> &'static str {
        DEFAULT_MODEL
    }

    async fn open(&self, request: &GenerationRequest) -> Result<FragmentStream, ProviderError> {
        // Translate our domain types to OpenAI's types
        let body = OpenAIRequest {
            model: &request.credentials.model,
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                OpenAIMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
            stream: true,
        };

        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        // Local OpenAI-compatible servers run without auth
        if !request.credentials.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", request.credentials.api_key));
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, error_text));
        }

        let fragments = sse::data_events(response.bytes_stream())
            .take_while(|event| {
                let done = matches!(event, Ok(payload) if payload.trim() == DONE_MARKER);
                futures::future::ready(!done)
            })
            .filter_map(|event| async move {
                match event.and_then(|payload| delta_text(&payload)) {
                    Ok(Some(text)) => Some(Ok(text)),
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                }
            });
        Ok(Box::pin(fragments))
    }
}
