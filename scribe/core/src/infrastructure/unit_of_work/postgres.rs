// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Unit of Work
//!
//! Production `UnitOfWork` backed by one `sqlx` transaction per scope step
//! against the `documents` table. Every query is filtered by the scope's
//! tenant, so one tenant can never read or overwrite another's rows.
//!
//! The transaction is opened by the first repository query after `enter`,
//! `commit` or `rollback`. `commit` only finishes the open transaction, so
//! once it reports success the data and its events are both released.
//!
//! Schema: `cli/migrations/0001_documents.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, warn};

use crate::application::unit_of_work::{UnitOfWork, UnitOfWorkError, UnitOfWorkFactory};
use crate::domain::document::{Document, DocumentId};
use crate::domain::events::DomainEvent;
use crate::domain::repository::{DocumentRepository, RepositoryError, SeenDocuments};
use crate::domain::tenant::TenantId;

const SELECT_COLUMNS: &str = "id, tenant_id, title, content_html, summary_html, created_at, updated_at, archived_at";

pub struct PostgresUnitOfWork {
    pool: PgPool,
    tenant: TenantId,
    active: bool,
    tx: Option<Transaction<'static, Postgres>>,
    seen: SeenDocuments,
}

impl PostgresUnitOfWork {
    pub fn new(pool: PgPool, tenant: TenantId) -> Self {
        Self {
            pool,
            tenant,
            active: false,
            tx: None,
            seen: SeenDocuments::new(),
        }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    async fn enter(&mut self) -> Result<(), UnitOfWorkError> {
        if self.active {
            return Err(UnitOfWorkError::AlreadyActive);
        }
        self.active = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), UnitOfWorkError> {
        if !self.active {
            return Err(UnitOfWorkError::NotActive);
        }
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
            debug!(tenant = %self.tenant, "Transaction committed");
        }
        self.seen.commit();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), UnitOfWorkError> {
        self.seen.discard_staged();
        if let Some(tx) = self.tx.take() {
            tx.rollback().await?;
        }
        Ok(())
    }

    async fn exit(&mut self) {
        self.active = false;
        self.seen.discard_staged();
        if let Some(tx) = self.tx.take() {
            if let Err(e) = tx.rollback().await {
                warn!(tenant = %self.tenant, error = %e, "Rollback on exit failed");
            }
        }
    }

    fn documents(&mut self) -> Result<Box<dyn DocumentRepository + '_>, UnitOfWorkError> {
        if !self.active {
            return Err(UnitOfWorkError::NotActive);
        }
        let Self {
            pool, tenant, tx, seen, ..
        } = self;
        Ok(Box::new(PostgresDocuments { pool, tx, tenant, seen }))
    }

    fn collect_new_events(&mut self) -> Box<dyn Iterator<Item = DomainEvent> + Send + '_> {
        Box::new(self.seen.drain())
    }
}

struct PostgresDocuments<'a> {
    pool: &'a PgPool,
    tx: &'a mut Option<Transaction<'static, Postgres>>,
    tenant: &'a TenantId,
    seen: &'a mut SeenDocuments,
}

fn row_to_document(row: &PgRow) -> Result<Document, RepositoryError> {
    let id: uuid::Uuid = row.try_get("id")?;
    let tenant: String = row.try_get("tenant_id")?;
    let tenant_id = TenantId::new(tenant).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
    let archived_at: Option<DateTime<Utc>> = row.try_get("archived_at")?;

    Ok(Document {
        id: DocumentId(id),
        tenant_id,
        title: row.try_get("title")?,
        content_html: row.try_get("content_html")?,
        summary_html: row.try_get("summary_html")?,
        created_at,
        updated_at,
        archived_at,
    })
}

impl PostgresDocuments<'_> {
    /// Connection of the open transaction, beginning one if needed
    async fn connection(&mut self) -> Result<&mut PgConnection, RepositoryError> {
        if self.tx.is_none() {
            let tx = self
                .pool
                .begin()
                .await
                .map_err(|e| RepositoryError::Database(format!("Failed to begin transaction: {}", e)))?;
            *self.tx = Some(tx);
        }
        self.tx
            .as_mut()
            .map(|tx| &mut **tx)
            .ok_or_else(|| RepositoryError::Database("transaction unavailable".to_string()))
    }

    fn check_tenant(&self, document: &Document) -> Result<(), RepositoryError> {
        if &document.tenant_id != self.tenant {
            return Err(RepositoryError::Unknown(format!(
                "document {} does not belong to tenant {}",
                document.id, self.tenant
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for PostgresDocuments<'_> {
    async fn get(&mut self, id: DocumentId) -> Result<Option<Document>, RepositoryError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM documents WHERE id = $1 AND tenant_id = $2");
        let tenant = self.tenant;
        let conn = self.connection().await?;
        let row = sqlx::query(&sql)
            .bind(id.0)
            .bind(tenant.as_str())
            .fetch_optional(conn)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to load document: {}", e)))?;

        let document = row.as_ref().map(row_to_document).transpose()?;
        if document.is_some() {
            self.seen.track(id);
        }
        Ok(document)
    }

    async fn add(&mut self, document: &Document, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        self.check_tenant(document)?;
        let conn = self.connection().await?;
        sqlx::query(
            r#"
            INSERT INTO documents (
                id, tenant_id, title, content_html, summary_html,
                created_at, updated_at, archived_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(document.id.0)
        .bind(document.tenant_id.as_str())
        .bind(&document.title)
        .bind(&document.content_html)
        .bind(document.summary_html.as_deref())
        .bind(document.created_at)
        .bind(document.updated_at)
        .bind(document.archived_at)
        .execute(conn)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to insert document: {}", e)))?;

        self.seen.stage(document.id, events);
        Ok(())
    }

    async fn save(&mut self, document: &Document, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        self.check_tenant(document)?;
        let conn = self.connection().await?;
        let result = sqlx::query(
            r#"
            UPDATE documents SET
                title = $3,
                content_html = $4,
                summary_html = $5,
                updated_at = $6,
                archived_at = $7
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(document.id.0)
        .bind(document.tenant_id.as_str())
        .bind(&document.title)
        .bind(&document.content_html)
        .bind(document.summary_html.as_deref())
        .bind(document.updated_at)
        .bind(document.archived_at)
        .execute(conn)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save document: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("document {}", document.id)));
        }

        self.seen.stage(document.id, events);
        Ok(())
    }

    async fn list(&mut self, include_archived: bool) -> Result<Vec<Document>, RepositoryError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM documents \
             WHERE tenant_id = $1 AND ($2 OR archived_at IS NULL) \
             ORDER BY created_at DESC"
        );
        let tenant = self.tenant;
        let conn = self.connection().await?;
        let rows = sqlx::query(&sql)
            .bind(tenant.as_str())
            .bind(include_archived)
            .fetch_all(conn)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to list documents: {}", e)))?;

        rows.iter().map(row_to_document).collect()
    }
}

/// One pooled transaction per scope step
#[derive(Clone)]
pub struct PostgresUnitOfWorkFactory {
    pool: PgPool,
}

impl PostgresUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    fn create(&self, tenant: TenantId) -> Box<dyn UnitOfWork> {
        Box::new(PostgresUnitOfWork::new(self.pool.clone(), tenant))
    }
}
