// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Server-Sent Events decoding for streaming vendor APIs
//
// Turns a raw byte stream into the `data` payloads of complete events.
// Multi-line data fields are joined with '\n'; comments and other fields
// (`event:`, `id:`, `retry:`) are ignored.

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::domain::llm::ProviderError;

pub fn data_events<S>(body: S) -> impl Stream<Item = Result<String, ProviderError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    async_stream::stream! {
        let mut body = Box::pin(body);
        let mut buffer: Vec<u8> = Vec::new();
        let mut data: Vec<String> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(ProviderError::from(e));
                    return;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim_end_matches(['\n', '\r']);

                if line.is_empty() {
                    if !data.is_empty() {
                        yield Ok(data.join("\n"));
                        data.clear();
                    }
                } else if let Some(value) = line.strip_prefix("data:") {
                    data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
                }
            }
        }

        // Unterminated final event
        let tail = String::from_utf8_lossy(&buffer);
        if let Some(value) = tail.trim_end_matches('\r').strip_prefix("data:") {
            data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        if !data.is_empty() {
            yield Ok(data.join("\n"));
        }
    }
}
