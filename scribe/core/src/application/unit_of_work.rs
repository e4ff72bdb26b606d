// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Unit of Work
//!
//! Transactional scope shared by the message bus and every handler of one bus
//! run.
//!
//! # DDD Pattern: Unit of Work
//!
//! - **Layer:** Application
//! - **Responsibility:** Own one storage session, expose repositories bound to
//!   it, and hand committed facts to the message bus
//! - **Collaborators:**
//!   - Domain: `DocumentRepository`, `SeenDocuments`
//!   - Infrastructure: `InMemoryUnitOfWork`, `PostgresUnitOfWork`
//!
//! # Lifecycle
//!
//! 1. `enter()` opens a session (transaction) for the scope's tenant
//! 2. Handlers load and save documents through `documents()`
//! 3. `commit()` persists staged writes and releases the staged events
//! 4. `exit()` rolls back anything uncommitted and releases the session
//! 5. `collect_new_events()` drains committed events; it may be called any
//!    number of times, including after `exit()`
//!
//! A scope may be entered again after `exit()`. Events committed in an earlier
//! step and not yet collected are kept.

use async_trait::async_trait;

use crate::domain::events::DomainEvent;
use crate::domain::repository::{DocumentRepository, RepositoryError};
use crate::domain::tenant::TenantId;

#[async_trait]
pub trait UnitOfWork: Send {
    fn tenant(&self) -> &TenantId;

    async fn enter(&mut self) -> Result<(), UnitOfWorkError>;

    /// Persist staged writes. Storage errors are returned as-is and the
    /// session stays open for `exit()`.
    async fn commit(&mut self) -> Result<(), UnitOfWorkError>;

    async fn rollback(&mut self) -> Result<(), UnitOfWorkError>;

    /// Roll back and release the session. Idempotent; failures are logged.
    async fn exit(&mut self);

    /// Repository bound to the open session.
    fn documents(&mut self) -> Result<Box<dyn DocumentRepository + '_>, UnitOfWorkError>;

    /// Lazily drain committed, not yet collected events.
    fn collect_new_events(&mut self) -> Box<dyn Iterator<Item = DomainEvent> + Send + '_>;
}

/// Builds one fresh scope per request; scopes are never shared.
pub trait UnitOfWorkFactory: Send + Sync {
    fn create(&self, tenant: TenantId) -> Box<dyn UnitOfWork>;
}

#[derive(Debug, thiserror::Error)]
pub enum UnitOfWorkError {
    #[error("Unit of work is not active; call enter() first")]
    NotActive,

    #[error("Unit of work is already active")]
    AlreadyActive,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for UnitOfWorkError {
    fn from(err: sqlx::Error) -> Self {
        UnitOfWorkError::Storage(err.to_string())
    }
}
