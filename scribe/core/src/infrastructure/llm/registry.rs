// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Registry - Backend selection from configuration
//
// Builds the configured generation backend and wraps it in the retrying,
// credential-resolving `ResilientProvider` the summary pipeline drives.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::credentials::CredentialResolver;
use super::gemini::GeminiAdapter;
use super::mock::MockBackend;
use super::openai::OpenAIAdapter;
use super::resilient::{GenerationSettings, ResilientProvider, RetryPolicy};
use crate::domain::config::{LlmConfig, LlmProviderKind};
use crate::domain::llm::{GenerationBackend, SummaryProvider};
use crate::infrastructure::db::resolve_env_reference;
use crate::infrastructure::secrets_manager::SecretStore;

/// Pacing of the mock backend so streaming stays visible in a browser
const MOCK_FRAGMENT_DELAY: Duration = Duration::from_millis(150);

pub struct ProviderRegistry {
    kind: LlmProviderKind,
    provider: Arc<ResilientProvider>,
}

impl ProviderRegistry {
    /// Create the summary provider from the `spec.llm` section
    pub fn from_config(config: &LlmConfig, secrets: Arc<dyn SecretStore>) -> anyhow::Result<Self> {
        let backend = Self::create_backend(config)?;
        info!(
            provider = %config.provider,
            model = config.model.as_deref().unwrap_or(backend.default_model()),
            max_attempts = config.retry.max_attempts,
            "Initializing LLM provider"
        );

        let credentials = CredentialResolver::new(config.provider, secrets, config.model.clone());
        let provider = ResilientProvider::new(
            backend,
            credentials,
            RetryPolicy::new(config.retry.max_attempts, config.retry.backoff),
            GenerationSettings::from(config),
        );

        Ok(Self {
            kind: config.provider,
            provider: Arc::new(provider),
        })
    }

    /// Create a backend instance from configuration
    fn create_backend(config: &LlmConfig) -> anyhow::Result<Arc<dyn GenerationBackend>> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(resolve_env_reference)
            .transpose()?;

        let backend: Arc<dyn GenerationBackend> = match config.provider {
            LlmProviderKind::Gemini => Arc::new(GeminiAdapter::new(endpoint)),
            LlmProviderKind::OpenAi => Arc::new(OpenAIAdapter::new(endpoint)),
            LlmProviderKind::Mock => Arc::new(MockBackend::with_delay(MOCK_FRAGMENT_DELAY)),
        };
        Ok(backend)
    }

    pub fn kind(&self) -> LlmProviderKind {
        self.kind
    }

    pub fn provider(&self) -> Arc<dyn SummaryProvider> {
        self.provider.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::secrets_manager::StaticSecretStore;

    #[test]
    fn test_registry_creation() {
        let mut config = LlmConfig::default();
        for kind in [LlmProviderKind::Gemini, LlmProviderKind::OpenAi, LlmProviderKind::Mock] {
            config.provider = kind;
            let registry = ProviderRegistry::from_config(&config, Arc::new(StaticSecretStore::new())).unwrap();
            assert_eq!(registry.kind(), kind);
            assert_eq!(registry.provider.backend_name(), kind.to_string());
        }
    }

    #[test]
    fn test_unset_endpoint_reference_fails() {
        let mut config = LlmConfig::default();
        config.endpoint = Some("env:SCRIBE_TEST_ENDPOINT_THAT_IS_NOT_SET".to_string());
        assert!(ProviderRegistry::from_config(&config, Arc::new(StaticSecretStore::new())).is_err());
    }
}
