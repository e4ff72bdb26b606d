// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Resilient summary provider
//
// Wraps one `GenerationBackend` with credential resolution, whole-attempt
// retries with exponential backoff, and fence stripping. An attempt is only
// retried while nothing has reached the consumer; once a fragment has been
// delivered a failure ends the stream, so output is never duplicated.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::credentials::CredentialResolver;
use super::fences::FenceStripper;
use crate::domain::config::LlmConfig;
use crate::domain::llm::{
    FragmentStream, GenerationBackend, GenerationRequest, ProviderError, SummaryOptions, SummaryProvider,
    SYSTEM_INSTRUCTION_HTML,
};
use crate::domain::tenant::TenantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after the failed attempt `failed` (0-based)
    pub fn delay_after(&self, failed: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(failed))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub thinking_budget: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 2048,
            thinking_budget: 0,
        }
    }
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            thinking_budget: config.thinking_budget,
        }
    }
}

pub struct ResilientProvider {
    backend: Arc<dyn GenerationBackend>,
    credentials: Arc<CredentialResolver>,
    retry: RetryPolicy,
    settings: GenerationSettings,
}

impl ResilientProvider {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        credentials: CredentialResolver,
        retry: RetryPolicy,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            backend,
            credentials: Arc::new(credentials),
            retry,
            settings,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

/// How one attempt ended
enum Attempt {
    Completed,
    /// Failed before anything was delivered
    Retryable(ProviderError),
    /// Failed after delivery; retrying would duplicate output
    Fatal(ProviderError),
    Cancelled,
}

impl SummaryProvider for ResilientProvider {
    fn stream(
        &self,
        tenant: &TenantId,
        content_html: String,
        options: &SummaryOptions,
        cancel: CancellationToken,
    ) -> FragmentStream {
        let backend = self.backend.clone();
        let credentials = self.credentials.clone();
        let retry = self.retry;
        let settings = self.settings;
        let tenant = tenant.clone();
        let prompt = options.build_prompt(&content_html);
        let mock_text = options.mock_text.clone();

        Box::pin(async_stream::stream! {
            let resolved = match credentials.resolve(&tenant, backend.as_ref()).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let request = GenerationRequest {
                prompt,
                content_html,
                system_instruction: SYSTEM_INSTRUCTION_HTML.to_string(),
                credentials: resolved,
                temperature: settings.temperature,
                max_output_tokens: settings.max_output_tokens,
                thinking_budget: settings.thinking_budget,
                mock_text,
            };

            let mut last_error = None;
            for attempt in 1..=retry.max_attempts {
                if attempt > 1 {
                    let delay = retry.delay_after(attempt - 2);
                    let cancelled = tokio::select! {
                        _ = cancel.cancelled() => true,
                        _ = tokio::time::sleep(delay) => false,
                    };
                    if cancelled {
                        yield Err(ProviderError::Cancelled);
                        return;
                    }
                }

                let opened = tokio::select! {
                    _ = cancel.cancelled() => None,
                    opened = backend.open(&request) => Some(opened),
                };
                let outcome = match opened {
                    None => Attempt::Cancelled,
                    Some(Err(e)) => Attempt::Retryable(e),
                    Some(Ok(mut fragments)) => {
                        let mut fences = FenceStripper::new();
                        let mut delivered = false;
                        loop {
                            let next = tokio::select! {
                                _ = cancel.cancelled() => None,
                                next = fragments.next() => Some(next),
                            };
                            match next {
                                None => break Attempt::Cancelled,
                                Some(None) => break Attempt::Completed,
                                Some(Some(Ok(raw))) => {
                                    if let Some(text) = fences.strip(&raw) {
                                        delivered = true;
                                        yield Ok(text);
                                    }
                                }
                                Some(Some(Err(e))) if delivered => break Attempt::Fatal(e),
                                Some(Some(Err(e))) => break Attempt::Retryable(e),
                            }
                        }
                    }
                };

                match outcome {
                    Attempt::Completed => {
                        if attempt > 1 {
                            info!(backend = backend.name(), attempt, "Generation succeeded after retry");
                        }
                        return;
                    }
                    Attempt::Cancelled => {
                        yield Err(ProviderError::Cancelled);
                        return;
                    }
                    Attempt::Fatal(e) => {
                        error!(backend = backend.name(), attempt, error = %e, "Stream failed after delivering output");
                        yield Err(ProviderError::StreamFailed {
                            attempts: attempt,
                            source: Box::new(e),
                        });
                        return;
                    }
                    Attempt::Retryable(e) => {
                        warn!(
                            backend = backend.name(),
                            attempt,
                            max_attempts = retry.max_attempts,
                            error = %e,
                            "Generation attempt failed"
                        );
                        last_error = Some(e);
                    }
                }
            }

            let last = last_error.unwrap_or_else(|| ProviderError::Upstream("LLM stream failed".to_string()));
            error!(backend = backend.name(), attempts = retry.max_attempts, error = %last, "Generation failed");
            yield Err(ProviderError::StreamFailed {
                attempts: retry.max_attempts,
                source: Box::new(last),
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::LlmProviderKind;
    use crate::infrastructure::secrets_manager::{EnvLookup, StaticSecretStore};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Plays back one scripted attempt per `open`
    struct ScriptedBackend {
        attempts: Mutex<VecDeque<Result<Vec<Result<String, ProviderError>>, ProviderError>>>,
        opened: Mutex<u32>,
    }

    impl ScriptedBackend {
        fn new(attempts: Vec<Result<Vec<Result<String, ProviderError>>, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                attempts: Mutex::new(attempts.into()),
                opened: Mutex::new(0),
            })
        }

        fn opened(&self) -> u32 {
            *self.opened.lock().unwrap()
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn default_model(&self) -> &'static str {
            "scripted-model"
        }

        fn requires_api_key(&self) -> bool {
            false
        }

        async fn open(&self, _request: &GenerationRequest) -> Result<FragmentStream, ProviderError> {
            *self.opened.lock().unwrap() += 1;
            let next = self
                .attempts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Upstream("script exhausted".into())));
            next.map(|fragments| Box::pin(futures::stream::iter(fragments)) as FragmentStream)
        }
    }

    fn provider(backend: Arc<ScriptedBackend>, max_attempts: u32) -> ResilientProvider {
        let no_env: EnvLookup = Arc::new(|_: &str| None);
        ResilientProvider::new(
            backend,
            CredentialResolver::with_lookup(LlmProviderKind::Mock, Arc::new(StaticSecretStore::new()), None, no_env),
            RetryPolicy::new(max_attempts, Duration::from_millis(1)),
            GenerationSettings::default(),
        )
    }

    async fn run(provider: &ResilientProvider) -> Vec<Result<String, ProviderError>> {
        provider
            .stream(
                &TenantId::new("acme").unwrap(),
                "<p>x</p>".to_string(),
                &SummaryOptions::default(),
                CancellationToken::new(),
            )
            .collect()
            .await
    }

    fn unavailable() -> ProviderError {
        ProviderError::Unavailable("503".into())
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(4, Duration::from_millis(500));
        assert_eq!(policy.delay_after(0), Duration::from_millis(500));
        assert_eq!(policy.delay_after(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_third_attempt_success_without_duplicates() {
        let backend = ScriptedBackend::new(vec![
            Err(unavailable()),
            Ok(vec![Err(unavailable())]),
            Ok(vec![Ok("<p>A</p>".into()), Ok("<p>B</p>".into())]),
        ]);
        let items = run(&provider(backend.clone(), 3)).await;

        assert_eq!(items, vec![Ok("<p>A</p>".to_string()), Ok("<p>B</p>".to_string())]);
        assert_eq!(backend.opened(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_yields_single_stream_failed() {
        let backend = ScriptedBackend::new(vec![Err(unavailable()), Err(ProviderError::RateLimit("quota".into()))]);
        let items = run(&provider(backend.clone(), 2)).await;

        assert_eq!(items.len(), 1);
        match &items[0] {
            Err(ProviderError::StreamFailed { attempts, source }) => {
                assert_eq!(*attempts, 2);
                assert_eq!(**source, ProviderError::RateLimit("quota".into()));
            }
            other => panic!("unexpected item: {:?}", other),
        }
        assert_eq!(backend.opened(), 2);
    }

    #[tokio::test]
    async fn test_no_retry_after_delivery() {
        let backend = ScriptedBackend::new(vec![
            Ok(vec![Ok("<p>A".into()), Err(unavailable())]),
            Ok(vec![Ok("<p>A</p>".into())]),
        ]);
        let items = run(&provider(backend.clone(), 3)).await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok("<p>A".to_string()));
        assert!(matches!(items[1], Err(ProviderError::StreamFailed { attempts: 1, .. })));
        assert_eq!(backend.opened(), 1);
    }

    #[tokio::test]
    async fn test_fences_reset_per_attempt() {
        let backend = ScriptedBackend::new(vec![
            Ok(vec![Ok("```html\n".into()), Err(unavailable())]),
            Ok(vec![Ok("```html\n<p>A</p>".into()), Ok("```".into())]),
        ]);
        let items = run(&provider(backend, 2)).await;
        assert_eq!(items, vec![Ok("<p>A</p>".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_open() {
        let no_env: EnvLookup = Arc::new(|_: &str| None);
        let provider = ResilientProvider::new(
            Arc::new(crate::infrastructure::llm::gemini::GeminiAdapter::new(None)),
            CredentialResolver::with_lookup(LlmProviderKind::Gemini, Arc::new(StaticSecretStore::new()), None, no_env),
            RetryPolicy::default(),
            GenerationSettings::default(),
        );
        let items = run(&provider).await;
        assert!(matches!(items.as_slice(), [Err(ProviderError::NotConfigured(_))]));
    }

    #[tokio::test]
    async fn test_cancellation_stops_backoff() {
        let backend = ScriptedBackend::new(vec![Err(unavailable()), Ok(vec![Ok("late".into())])]);
        let provider = ResilientProvider::new(
            backend.clone(),
            CredentialResolver::with_lookup(
                LlmProviderKind::Mock,
                Arc::new(StaticSecretStore::new()),
                None,
                Arc::new(|_: &str| None),
            ),
            RetryPolicy::new(2, Duration::from_secs(3600)),
            GenerationSettings::default(),
        );
        let cancel = CancellationToken::new();
        let mut stream = provider.stream(
            &TenantId::new("acme").unwrap(),
            "<p>x</p>".to_string(),
            &SummaryOptions::default(),
            cancel.clone(),
        );

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let item = tokio::time::timeout(Duration::from_secs(5), stream.next()).await.unwrap();
        canceller.await.unwrap();

        assert_eq!(item, Some(Err(ProviderError::Cancelled)));
        assert_eq!(backend.opened(), 1);
    }
}
