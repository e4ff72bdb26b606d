// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that the
//! PostgreSQL unit of work factory is built from.

use sqlx::postgres::{PgPool, PgPoolOptions};
use anyhow::{Context, Result};

use crate::domain::config::DatabaseConfig;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    /// Connect when a URL is configured; `None` means in-memory storage.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Option<Self>> {
        let Some(url) = config.url.as_deref() else {
            return Ok(None);
        };
        let url = resolve_env_reference(url)?;
        Ok(Some(Self::new(&url, config.max_connections).await?))
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Resolve "env:VAR_NAME" references used throughout the config file
pub fn resolve_env_reference(value: &str) -> Result<String> {
    match value.strip_prefix("env:") {
        Some(var_name) => std::env::var(var_name)
            .with_context(|| format!("Environment variable not set: {}", var_name)),
        None => Ok(value.to_string()),
    }
}
