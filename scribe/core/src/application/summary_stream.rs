// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Summary Stream Service
//!
//! Drives one streamed summary session and turns it into wire frames.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Collaborators:**
//!   - Application: `UnitOfWorkFactory` (content lookup)
//!   - Domain: `SummaryProvider`
//!
//! # Session
//!
//! `open` is emitted before any lookup. The document content is read in a
//! short scope that is closed before the provider runs. Each fragment becomes
//! a `chunk` with a contiguous index; exhaustion ends with `done`. Any failure
//! ends the session with exactly one `error` frame carrying a client-safe
//! message and no `done`. Past the deadline nothing but the `stream timeout`
//! error is emitted, and waiting on the provider is itself bounded by the
//! deadline. When the consumer goes away the session stops pulling.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::errors::ApplicationError;
use crate::application::unit_of_work::UnitOfWorkFactory;
use crate::application::views;
use crate::domain::document::DocumentId;
use crate::domain::llm::{ProviderError, SummaryOptions, SummaryProvider};
use crate::domain::tenant::TenantId;

/// Deadline used when the requested timeout does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub const MSG_TIMEOUT: &str = "stream timeout";
pub const MSG_NOT_FOUND: &str = "Document not found.";
pub const MSG_NOT_CONFIGURED: &str = "Tenant not configured for AI provider. Set GEMINI_API_KEY or tenant secrets.";
pub const MSG_AUTH: &str = "Provider authentication or permission error. Check API key and tenant configuration.";
pub const MSG_RATE_LIMIT: &str = "Provider is rate limited or quota exceeded. Please retry shortly.";
pub const MSG_TRANSIENT: &str = "Provider temporarily unavailable. Please retry.";
pub const MSG_GENERIC: &str = "Summarization failed. Please try again.";
pub const MSG_UNEXPECTED: &str = "Unexpected error. Please try again.";

/// One server-sent frame of a summary session
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open {
        document_id: DocumentId,
        request_id: Option<String>,
    },
    Chunk {
        text: String,
        index: usize,
    },
    Done,
    Error {
        message: String,
    },
}

impl Frame {
    pub fn event_name(&self) -> &'static str {
        match self {
            Frame::Open { .. } => "open",
            Frame::Chunk { .. } => "chunk",
            Frame::Done => "done",
            Frame::Error { .. } => "error",
        }
    }

    pub fn data(&self) -> serde_json::Value {
        match self {
            Frame::Open {
                document_id,
                request_id,
            } => json!({ "document_id": document_id, "request_id": request_id }),
            Frame::Chunk { text, index } => json!({ "text": text, "index": index }),
            Frame::Done => json!({}),
            Frame::Error { message } => json!({ "message": message }),
        }
    }

    /// `event: <name>\ndata: <json>\n\n`
    pub fn encode(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event_name(), self.data())
    }

    fn error(message: &str) -> Self {
        Frame::Error {
            message: message.to_string(),
        }
    }
}

const AUTH_KEYWORDS: &[&str] = &["api key", "permission", "unauthorized", "forbidden", "invalid key"];
const RATE_KEYWORDS: &[&str] = &["quota", "rate", "429", "resourceexhausted", "exceeded"];
const TRANSIENT_KEYWORDS: &[&str] = &["timeout", "deadline", "unavailable", "temporarily"];

/// Client-safe message for a provider failure
pub fn client_message(err: &ProviderError) -> &'static str {
    match err.root() {
        ProviderError::NotConfigured(_) => MSG_NOT_CONFIGURED,
        ProviderError::Authentication(_) => MSG_AUTH,
        ProviderError::RateLimit(_) => MSG_RATE_LIMIT,
        ProviderError::Unavailable(_) => MSG_TRANSIENT,
        other => {
            let text = other.to_string().to_lowercase();
            let matches = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));
            if matches(AUTH_KEYWORDS) {
                MSG_AUTH
            } else if matches(RATE_KEYWORDS) {
                MSG_RATE_LIMIT
            } else if matches(TRANSIENT_KEYWORDS) {
                MSG_TRANSIENT
            } else {
                MSG_GENERIC
            }
        }
    }
}

enum Pulled {
    Fragment(Option<Result<String, ProviderError>>),
    DeadlinePassed,
    Cancelled,
}

pub struct SummaryStreamService {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    provider: Arc<dyn SummaryProvider>,
    default_timeout: Duration,
}

impl SummaryStreamService {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        provider: Arc<dyn SummaryProvider>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            uow_factory,
            provider,
            default_timeout,
        }
    }

    /// Run one session. Dropping the returned stream cancels `cancel`.
    pub fn stream(
        &self,
        tenant: TenantId,
        document_id: DocumentId,
        request_id: Option<String>,
        options: SummaryOptions,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Frame> + Send + 'static {
        let uow_factory = self.uow_factory.clone();
        let provider = self.provider.clone();
        let timeout = options.timeout.unwrap_or(self.default_timeout);

        async_stream::stream! {
            let _guard = cancel.clone().drop_guard();
            let deadline = Instant::now()
                .checked_add(timeout)
                .unwrap_or_else(|| Instant::now() + FAR_FUTURE);
            let rid = request_id.clone().unwrap_or_default();

            info!(document_id = %document_id, request_id = %rid, tenant = %tenant, "summary_stream_start");
            yield Frame::Open { document_id, request_id };

            let content = {
                let mut uow = uow_factory.create(tenant.clone());
                views::content_for_summary(uow.as_mut(), document_id).await
            };
            let content = match content {
                Ok(content) => content,
                Err(ApplicationError::DocumentNotFound(_)) => {
                    warn!(document_id = %document_id, request_id = %rid, tenant = %tenant, "summary_stream_not_found");
                    yield Frame::error(MSG_NOT_FOUND);
                    return;
                }
                Err(e) => {
                    error!(document_id = %document_id, request_id = %rid, tenant = %tenant, error = %e, "summary_stream_unhandled_error");
                    yield Frame::error(MSG_UNEXPECTED);
                    return;
                }
            };

            let mut fragments = provider.stream(&tenant, content, &options, cancel.clone());
            let mut index = 0usize;
            loop {
                let pulled = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Pulled::Cancelled,
                    next = tokio::time::timeout_at(deadline, fragments.next()) => match next {
                        Ok(next) => Pulled::Fragment(next),
                        Err(_) => Pulled::DeadlinePassed,
                    },
                };

                let pulled = match pulled {
                    Pulled::Fragment(_) if Instant::now() >= deadline => Pulled::DeadlinePassed,
                    other => other,
                };

                match pulled {
                    Pulled::Cancelled | Pulled::Fragment(Some(Err(ProviderError::Cancelled))) => {
                        debug!(document_id = %document_id, request_id = %rid, "summary_stream_cancelled");
                        return;
                    }
                    Pulled::DeadlinePassed => {
                        warn!(document_id = %document_id, request_id = %rid, tenant = %tenant, timeout_s = timeout.as_secs_f64(), "summary_stream_timeout");
                        yield Frame::error(MSG_TIMEOUT);
                        return;
                    }
                    Pulled::Fragment(None) => {
                        info!(document_id = %document_id, request_id = %rid, tenant = %tenant, chunks = index, "summary_stream_done");
                        yield Frame::Done;
                        return;
                    }
                    Pulled::Fragment(Some(Ok(text))) => {
                        yield Frame::Chunk { text, index };
                        index += 1;
                    }
                    Pulled::Fragment(Some(Err(ProviderError::NotConfigured(_)))) => {
                        warn!(document_id = %document_id, request_id = %rid, tenant = %tenant, "summary_stream_no_tenant_config");
                        yield Frame::error(MSG_NOT_CONFIGURED);
                        return;
                    }
                    Pulled::Fragment(Some(Err(e))) => {
                        error!(document_id = %document_id, request_id = %rid, tenant = %tenant, error = %e, "summary_stream_provider_error");
                        yield Frame::error(client_message(&e));
                        return;
                    }
                }
            }
        }
    }
}
