// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Tenant identity value object.
//!
//! Tenants are resolved once at the edge (HTTP middleware, CLI flag) and then
//! passed explicitly into every unit of work, secret lookup and provider
//! resolution. There is no ambient "current tenant".

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a tenant (typically a hostname such as `acme.scribe.app`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    #[error("Tenant identifier must not be empty")]
    Empty,
}

impl TenantId {
    pub fn new(value: impl Into<String>) -> Result<Self, TenantError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(TenantError::Empty);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the environment variable holding this tenant's JSON secrets.
    ///
    /// Dots are dropped and the rest is upper-cased, so `acme.scribe.app`
    /// maps to `ACMESCRIBEAPP`.
    pub fn secrets_env_var(&self) -> String {
        self.0.replace('.', "").to_uppercase()
    }
}

impl TryFrom<String> for TenantId {
    type Error = TenantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TenantId {
    type Err = TenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
