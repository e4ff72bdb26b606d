// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Tenant credential resolution
//
// API key: tenant secret, then shared secret, then process environment.
// Model: tenant secret, then `spec.llm.model`, then process environment,
// then the backend default.

use std::sync::Arc;

use tracing::debug;

use crate::domain::config::LlmProviderKind;
use crate::domain::llm::{GenerationBackend, ProviderCredentials, ProviderError};
use crate::domain::tenant::TenantId;
use crate::infrastructure::secrets_manager::{process_env, EnvLookup, SecretStore};

/// Secret names consulted for one provider kind
struct KeyNames {
    tenant_keys: &'static [&'static str],
    shared_key: Option<&'static str>,
    env_key: Option<&'static str>,
    tenant_models: &'static [&'static str],
    env_model: Option<&'static str>,
}

fn key_names(kind: LlmProviderKind) -> KeyNames {
    match kind {
        LlmProviderKind::Gemini => KeyNames {
            tenant_keys: &["GEMINI_API_KEY", "LLM_GOOGLE_API_KEY"],
            shared_key: Some("LLM_GOOGLE_API_KEY"),
            env_key: Some("GEMINI_API_KEY"),
            tenant_models: &["LLM_GOOGLE_MODEL", "LLM_MODEL"],
            env_model: Some("LLM_GOOGLE_MODEL"),
        },
        LlmProviderKind::OpenAi => KeyNames {
            tenant_keys: &["OPENAI_API_KEY", "LLM_OPENAI_API_KEY"],
            shared_key: Some("LLM_OPENAI_API_KEY"),
            env_key: Some("OPENAI_API_KEY"),
            tenant_models: &["LLM_OPENAI_MODEL", "LLM_MODEL"],
            env_model: Some("LLM_OPENAI_MODEL"),
        },
        LlmProviderKind::Mock => KeyNames {
            tenant_keys: &[],
            shared_key: None,
            env_key: None,
            tenant_models: &[],
            env_model: None,
        },
    }
}

pub struct CredentialResolver {
    kind: LlmProviderKind,
    secrets: Arc<dyn SecretStore>,
    configured_model: Option<String>,
    lookup: EnvLookup,
}

impl CredentialResolver {
    pub fn new(kind: LlmProviderKind, secrets: Arc<dyn SecretStore>, configured_model: Option<String>) -> Self {
        Self::with_lookup(kind, secrets, configured_model, process_env())
    }

    pub fn with_lookup(
        kind: LlmProviderKind,
        secrets: Arc<dyn SecretStore>,
        configured_model: Option<String>,
        lookup: EnvLookup,
    ) -> Self {
        Self {
            kind,
            secrets,
            configured_model,
            lookup,
        }
    }

    pub async fn resolve(
        &self,
        tenant: &TenantId,
        backend: &dyn GenerationBackend,
    ) -> Result<ProviderCredentials, ProviderError> {
        let names = key_names(self.kind);

        // A tenant without secrets still gets shared and environment fallbacks
        let tenant_secrets = match self.secrets.tenant_secrets(tenant).await {
            Ok(secrets) => secrets,
            Err(e) => {
                debug!(tenant = %tenant, error = %e, "No tenant secrets, using shared configuration");
                Default::default()
            }
        };
        let tenant_secret = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| tenant_secrets.get(*k))
                .find(|v| !v.is_empty())
                .cloned()
        };
        let env = |key: Option<&str>| key.and_then(|k| (self.lookup)(k)).filter(|v| !v.is_empty());

        let mut api_key = tenant_secret(names.tenant_keys);
        if api_key.is_none() {
            if let Some(shared) = names.shared_key {
                api_key = self.secrets.shared_secret(shared).await;
            }
        }
        let api_key = api_key.or_else(|| env(names.env_key));

        let api_key = match api_key {
            Some(key) => key,
            None if !backend.requires_api_key() => String::new(),
            None => return Err(ProviderError::NotConfigured(tenant.clone())),
        };

        let model = tenant_secret(names.tenant_models)
            .or_else(|| self.configured_model.clone())
            .or_else(|| env(names.env_model))
            .unwrap_or_else(|| backend.default_model().to_string());

        debug!(tenant = %tenant, backend = backend.name(), model = %model, "Resolved provider credentials");
        Ok(ProviderCredentials { api_key, model })
    }
}
