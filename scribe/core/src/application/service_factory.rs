// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service Factory - Application Layer
//!
//! Wires configuration into the running services: the storage backend behind
//! every unit of work, the validated handler registry, the committed-event
//! bus and the summary stream service.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Composition root shared by the HTTP server and the CLI

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::application::handlers::{register_command_handlers, register_event_handlers};
use crate::application::message_bus::{HandlerRegistry, MessageBus};
use crate::application::summary_stream::SummaryStreamService;
use crate::application::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::config::ScribeConfigManifest;
use crate::domain::tenant::TenantId;
use crate::infrastructure::db::Database;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::llm::ProviderRegistry;
use crate::infrastructure::secrets_manager::{EnvSecretStore, SecretStore};
use crate::infrastructure::unit_of_work::{InMemoryUnitOfWorkFactory, PostgresUnitOfWorkFactory};

/// Creates a UnitOfWorkFactory for the configured storage backend
pub fn create_unit_of_work_factory(database: Option<&Database>) -> Arc<dyn UnitOfWorkFactory> {
    match database {
        Some(db) => Arc::new(PostgresUnitOfWorkFactory::new(db.get_pool().clone())),
        None => Arc::new(InMemoryUnitOfWorkFactory::default()),
    }
}

/// Long-lived services, one instance per process
#[derive(Clone)]
pub struct ScribeServices {
    pub uow_factory: Arc<dyn UnitOfWorkFactory>,
    pub handlers: Arc<HandlerRegistry>,
    pub event_bus: Arc<EventBus>,
    pub summaries: Arc<SummaryStreamService>,
}

impl ScribeServices {
    /// Connect to the configured storage and build every service
    pub async fn from_config(config: &ScribeConfigManifest) -> anyhow::Result<Self> {
        let database = Database::from_config(&config.spec.database).await?;
        match &database {
            Some(_) => info!("Using PostgreSQL document storage"),
            None => info!("No database configured, using in-memory document storage"),
        }

        let secrets: Arc<dyn SecretStore> = Arc::new(EnvSecretStore::new(config.spec.llm.shared_secrets.clone()));
        Self::build(config, create_unit_of_work_factory(database.as_ref()), secrets)
    }

    /// Build services over an existing storage backend and secret store
    pub fn build(
        config: &ScribeConfigManifest,
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        secrets: Arc<dyn SecretStore>,
    ) -> anyhow::Result<Self> {
        let event_bus = Arc::new(EventBus::new(config.spec.event_bus.capacity));

        let builder = register_command_handlers(HandlerRegistry::builder());
        let builder = register_event_handlers(builder, &config.spec.summaries, event_bus.clone());
        let handlers = Arc::new(builder.build().context("Invalid handler registry")?);

        let registry = ProviderRegistry::from_config(&config.spec.llm, secrets)
            .context("Failed to initialize LLM provider")?;
        let summaries = Arc::new(SummaryStreamService::new(
            uow_factory.clone(),
            registry.provider(),
            config.spec.llm.stream_timeout,
        ));

        Ok(Self {
            uow_factory,
            handlers,
            event_bus,
            summaries,
        })
    }

    /// A fresh bus bound to a fresh unit of work for `tenant`
    pub fn message_bus(&self, tenant: TenantId) -> MessageBus {
        MessageBus::new(self.uow_factory.create(tenant), self.handlers.clone())
    }

    pub fn unit_of_work(&self, tenant: TenantId) -> Box<dyn UnitOfWork> {
        self.uow_factory.create(tenant)
    }
}
