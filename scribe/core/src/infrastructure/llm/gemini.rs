// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Gemini LLM Provider Adapter
//
// Anti-Corruption Layer for the Google Generative Language API
// (`models/{model}:streamGenerateContent?alt=sse`).

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::sse;
use crate::domain::llm::{FragmentStream, GenerationBackend, GenerationRequest, ProviderError};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiAdapter {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize)]
struct GeminiChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiChunkContent>,
}

#[derive(Deserialize)]
struct GeminiChunkContent {
    #[serde(default)]
    parts: Vec<GeminiChunkPart>,
}

#[derive(Deserialize)]
struct GeminiChunkPart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: String,
}

impl GeminiAdapter {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }
}

/// Text of one streamed chunk; thought parts are not part of the answer
fn chunk_text(payload: &str) -> Result<Option<String>, ProviderError> {
    let chunk: GeminiChunk = serde_json::from_str(payload)
        .map_err(|e| ProviderError::Upstream(format!("Failed to parse stream chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        let status = error
            .code
            .and_then(|c| reqwest::StatusCode::from_u16(c).ok())
            .unwrap_or(reqwest::StatusCode::BAD_GATEWAY);
        return Err(ProviderError::from_status(status, error.message));
    }

    let text: String = chunk
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    Ok((!text.is_empty()).then_some(text))
}

#[async_trait]
impl GenerationBackend for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn default_model(&self) -> &'static str {
        DEFAULT_MODEL
    }

    async fn open(&self, request: &GenerationRequest) -> Result<FragmentStream, ProviderError> {
        let body = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: &request.prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
                thinking_config: ThinkingConfig {
                    thinking_budget: request.thinking_budget,
                },
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.endpoint.trim_end_matches('/'),
            request.credentials.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &request.credentials.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, error_text));
        }

        let fragments = sse::data_events(response.bytes_stream()).filter_map(|event| async move {
            match event.and_then(|payload| chunk_text(&payload)) {
                Ok(Some(text)) => Some(Ok(text)),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Box::pin(fragments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::ProviderCredentials;

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "Summarize\n\n<p>x</p>".to_string(),
            content_html: "<p>x</p>".to_string(),
            system_instruction: "Return HTML".to_string(),
            credentials: ProviderCredentials {
                api_key: "test-key".to_string(),
                model: "gemini-test".to_string(),
            },
            temperature: 0.3,
            max_output_tokens: 2048,
            thinking_budget: 0,
            mock_text: None,
        }
    }

    #[test]
    fn test_chunk_text_skips_thoughts() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"hmm","thought":true},{"text":"<p>A</p>"}]}}]}"#;
        assert_eq!(chunk_text(payload).unwrap().as_deref(), Some("<p>A</p>"));
        assert_eq!(chunk_text(r#"{"candidates":[]}"#).unwrap(), None);
    }

    #[test]
    fn test_chunk_error_is_classified() {
        let payload = r#"{"error":{"code":429,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(chunk_text(payload), Err(ProviderError::RateLimit(_))));
    }

    #[tokio::test]
    async fn test_streams_fragments_from_sse() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"<p>Hel\"}]}}]}\r\n\r\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo</p>\"}]}}]}\r\n\r\n",
        );
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:streamGenerateContent")
            .match_query(mockito::Matcher::UrlEncoded("alt".into(), "sse".into()))
            .match_header("x-goog-api-key", "test-key")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"generationConfig":{"temperature":0.3,"maxOutputTokens":2048,"thinkingConfig":{"thinkingBudget":0}}}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let adapter = GeminiAdapter::new(Some(server.url()));
        let fragments: Vec<String> = adapter
            .open(&request())
            .await
            .unwrap()
            .map(|f| f.unwrap())
            .collect()
            .await;

        assert_eq!(fragments, vec!["<p>Hel".to_string(), "lo</p>".to_string()]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_maps_to_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-test:streamGenerateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .with_body("API key not valid")
            .create_async()
            .await;

        let adapter = GeminiAdapter::new(Some(server.url()));
        let err = adapter.open(&request()).await.err().unwrap();
        assert!(matches!(err, ProviderError::Authentication(ref m) if m.contains("API key not valid")));
    }
}
