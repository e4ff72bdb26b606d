// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Mock generation backend
//
// Deterministic, offline "summary": the first 400 characters of the trimmed
// content (or `mock_text` when the request carries one), delivered in three
// pieces. Used for local development and demos without an API key.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::domain::llm::{FragmentStream, GenerationBackend, GenerationRequest, ProviderError};

const EMPTY_CONTENT_TEXT: &str = "No content provided to summarize.";
const SUMMARY_CHARS: usize = 400;
const SPLIT_POINTS: [usize; 2] = [200, 350];

#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    delay: Duration,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause before each piece, to make streaming visible in a browser
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

fn mock_text(request: &GenerationRequest) -> String {
    if let Some(text) = &request.mock_text {
        return text.clone();
    }
    let excerpt: String = request.content_html.trim().chars().take(SUMMARY_CHARS).collect();
    if excerpt.is_empty() {
        EMPTY_CONTENT_TEXT.to_string()
    } else {
        excerpt
    }
}

/// Split at character (not byte) offsets, dropping empty pieces
fn pieces(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut bounds = vec![0];
    bounds.extend(SPLIT_POINTS.iter().map(|p| (*p).min(chars.len())));
    bounds.push(chars.len());

    bounds
        .windows(2)
        .map(|w| chars[w[0]..w[1].max(w[0])].iter().collect::<String>())
        .filter(|piece| !piece.is_empty())
        .collect()
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn default_model(&self) -> &'static str {
        "mock"
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    async fn open(&self, request: &GenerationRequest) -> Result<FragmentStream, ProviderError> {
        let delay = self.delay;
        let stream = futures::stream::iter(pieces(&mock_text(request))).then(move |piece| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(piece)
        });
        Ok(Box::pin(stream))
    }
}
