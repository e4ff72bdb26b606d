// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory unit of work.
//!
//! Documents live in a shared `InMemoryDocumentStore`. A scope step buffers its
//! writes privately and applies them to the store on `commit()`, so rolled-back
//! work is never visible to other scopes. Used for development and as the
//! storage double in tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::application::unit_of_work::{UnitOfWork, UnitOfWorkError, UnitOfWorkFactory};
use crate::domain::document::{Document, DocumentId};
use crate::domain::events::DomainEvent;
use crate::domain::repository::{DocumentRepository, RepositoryError, SeenDocuments};
use crate::domain::tenant::TenantId;

/// Thread-safe HashMap-backed document storage shared by all scopes
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<DocumentId, Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &DocumentId) -> Option<Document> {
        self.documents.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    async fn apply(&self, writes: HashMap<DocumentId, Document>) {
        let mut documents = self.documents.write().await;
        documents.extend(writes);
    }
}

pub struct InMemoryUnitOfWork {
    store: InMemoryDocumentStore,
    tenant: TenantId,
    /// Pending writes of the open step; `None` outside `enter`/`exit`.
    writes: Option<HashMap<DocumentId, Document>>,
    seen: SeenDocuments,
}

impl InMemoryUnitOfWork {
    pub fn new(store: InMemoryDocumentStore, tenant: TenantId) -> Self {
        Self {
            store,
            tenant,
            writes: None,
            seen: SeenDocuments::new(),
        }
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    async fn enter(&mut self) -> Result<(), UnitOfWorkError> {
        if self.writes.is_some() {
            return Err(UnitOfWorkError::AlreadyActive);
        }
        self.writes = Some(HashMap::new());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), UnitOfWorkError> {
        let writes = self.writes.as_mut().ok_or(UnitOfWorkError::NotActive)?;
        let staged = std::mem::take(writes);
        debug!(documents = staged.len(), "Committing in-memory writes");
        self.store.apply(staged).await;
        self.seen.commit();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), UnitOfWorkError> {
        if let Some(writes) = self.writes.as_mut() {
            writes.clear();
        }
        self.seen.discard_staged();
        Ok(())
    }

    async fn exit(&mut self) {
        self.writes = None;
        self.seen.discard_staged();
    }

    fn documents(&mut self) -> Result<Box<dyn DocumentRepository + '_>, UnitOfWorkError> {
        let Self {
            store,
            tenant,
            writes,
            seen,
        } = self;
        let writes = writes.as_mut().ok_or(UnitOfWorkError::NotActive)?;
        Ok(Box::new(InMemoryDocuments {
            store,
            tenant,
            writes,
            seen,
        }))
    }

    fn collect_new_events(&mut self) -> Box<dyn Iterator<Item = DomainEvent> + Send + '_> {
        Box::new(self.seen.drain())
    }
}

/// Repository view over the store plus the open step's pending writes
struct InMemoryDocuments<'a> {
    store: &'a InMemoryDocumentStore,
    tenant: &'a TenantId,
    writes: &'a mut HashMap<DocumentId, Document>,
    seen: &'a mut SeenDocuments,
}

impl InMemoryDocuments<'_> {
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
impl DocumentRepository for InMemoryDocuments<'_> {
    async fn get(&mut self, id: DocumentId) -> Result<Option<Document>, RepositoryError> {
        let found = match self.writes.get(&id) {
            Some(doc) => Some(doc.clone()),
            None => self.store.get(&id).await,
        };
        let found = found.filter(|doc| &doc.tenant_id == self.tenant);
        if found.is_some() {
            self.seen.track(id);
        }
        Ok(found)
    }

    async fn add(&mut self, document: &Document, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        self.check_tenant(document)?;
        if self.writes.contains_key(&document.id) || self.store.get(&document.id).await.is_some() {
            return Err(RepositoryError::Database(format!(
                "duplicate key value violates unique constraint: document {}",
                document.id
            )));
        }
        self.writes.insert(document.id, document.clone());
        self.seen.stage(document.id, events);
        Ok(())
    }

    async fn save(&mut self, document: &Document, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        self.check_tenant(document)?;
        self.writes.insert(document.id, document.clone());
        self.seen.stage(document.id, events);
        Ok(())
    }

    async fn list(&mut self, include_archived: bool) -> Result<Vec<Document>, RepositoryError> {
        let mut merged: HashMap<DocumentId, Document> = self
            .store
            .documents
            .read()
            .await
            .values()
            .filter(|doc| &doc.tenant_id == self.tenant)
            .map(|doc| (doc.id, doc.clone()))
            .collect();
        merged.extend(self.writes.iter().map(|(id, doc)| (*id, doc.clone())));

        let mut documents: Vec<Document> = merged
            .into_values()
            .filter(|doc| include_archived || !doc.is_archived())
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }
}

/// Scopes over one shared store
#[derive(Clone, Default)]
pub struct InMemoryUnitOfWorkFactory {
    store: InMemoryDocumentStore,
}

impl InMemoryUnitOfWorkFactory {
    pub fn new(store: InMemoryDocumentStore) -> Self {
        Self { store }
    }
}

impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    fn create(&self, tenant: TenantId) -> Box<dyn UnitOfWork> {
        Box::new(InMemoryUnitOfWork::new(self.store.clone(), tenant))
    }
}
