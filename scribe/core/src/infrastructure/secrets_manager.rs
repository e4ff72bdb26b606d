// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Secrets Manager
//!
//! Tenant-scoped and shared secret lookup.
//!
//! Tenant secrets are a JSON object stored in one environment variable per
//! tenant; the variable name is the tenant id with dots removed, upper-cased
//! (`acme.scribe.app` → `ACMESCRIBEAPP`). Shared secrets come from
//! `spec.llm.shared_secrets` in the config file, then from the process
//! environment.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::tenant::TenantId;

/// Environment lookup, injectable for tests
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub fn process_env() -> EnvLookup {
    Arc::new(|key: &str| std::env::var(key).ok())
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// All secrets of `tenant`. Unknown tenants fail with `NoConfigForTenant`.
    async fn tenant_secrets(&self, tenant: &TenantId) -> Result<HashMap<String, String>, SecretsError>;

    async fn shared_secret(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretsError {
    #[error("No config found for tenant {0}")]
    NoConfigForTenant(TenantId),

    #[error("Secrets for tenant {tenant} are not a valid JSON object: {reason}")]
    Malformed { tenant: TenantId, reason: String },
}

/// Secrets read from environment variables
pub struct EnvSecretStore {
    lookup: EnvLookup,
    shared: HashMap<String, String>,
}

impl EnvSecretStore {
    pub fn new(shared: HashMap<String, String>) -> Self {
        Self::with_lookup(shared, process_env())
    }

    pub fn with_lookup(shared: HashMap<String, String>, lookup: EnvLookup) -> Self {
        Self { lookup, shared }
    }

    /// Resolve "env:VAR_NAME" references in configured shared secrets
    fn resolve(&self, value: &str) -> Option<String> {
        match value.strip_prefix("env:") {
            Some(var) => (self.lookup)(var),
            None => Some(value.to_string()),
        }
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn tenant_secrets(&self, tenant: &TenantId) -> Result<HashMap<String, String>, SecretsError> {
        let var = tenant.secrets_env_var();
        let raw = (self.lookup)(&var).ok_or_else(|| SecretsError::NoConfigForTenant(tenant.clone()))?;

        let parsed: HashMap<String, serde_json::Value> =
            serde_json::from_str(&raw).map_err(|e| {
                warn!(tenant = %tenant, "Hiding secret manager error: tenant secrets are not valid JSON");
                SecretsError::Malformed {
                    tenant: tenant.clone(),
                    reason: e.to_string(),
                }
            })?;

        Ok(parsed
            .into_iter()
            .filter_map(|(k, v)| match v {
                serde_json::Value::String(s) => Some((k, s)),
                serde_json::Value::Null => None,
                other => Some((k, other.to_string())),
            })
            .collect())
    }

    async fn shared_secret(&self, key: &str) -> Option<String> {
        self.shared
            .get(key)
            .and_then(|v| self.resolve(v))
            .or_else(|| (self.lookup)(key))
            .filter(|v| !v.is_empty())
    }
}

/// Fixed secrets, for tests and single-tenant deployments
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    tenants: HashMap<TenantId, HashMap<String, String>>,
    shared: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant_secret(mut self, tenant: &TenantId, key: &str, value: &str) -> Self {
        self.tenants
            .entry(tenant.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_shared_secret(mut self, key: &str, value: &str) -> Self {
        self.shared.insert(key.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn tenant_secrets(&self, tenant: &TenantId) -> Result<HashMap<String, String>, SecretsError> {
        self.tenants
            .get(tenant)
            .cloned()
            .ok_or_else(|| SecretsError::NoConfigForTenant(tenant.clone()))
    }

    async fn shared_secret(&self, key: &str) -> Option<String> {
        self.shared.get(key).cloned()
    }
}
