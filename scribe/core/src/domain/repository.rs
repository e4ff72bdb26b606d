// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contract for the `Document` aggregate. Repositories are views
//! onto the storage session owned by a unit of work
//! (`crate::application::unit_of_work`); they never outlive it.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `DocumentRepository` | `Document` | `InMemoryDocuments`, `PostgresDocuments` |
//!
//! Each repository records the documents it loaded or saved in a
//! [`SeenDocuments`] ledger together with the events handed to `add`/`save`.
//! Staged events become collectable only once the unit of work commits.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;

use crate::domain::document::{Document, DocumentId};
use crate::domain::events::DomainEvent;

#[async_trait]
pub trait DocumentRepository: Send {
    /// Load a document owned by the scope's tenant.
    async fn get(&mut self, id: DocumentId) -> Result<Option<Document>, RepositoryError>;

    /// Stage a new document and the event that created it.
    async fn add(&mut self, document: &Document, events: Vec<DomainEvent>) -> Result<(), RepositoryError>;

    /// Stage changes to an existing document and the events they produced.
    async fn save(&mut self, document: &Document, events: Vec<DomainEvent>) -> Result<(), RepositoryError>;

    /// Documents of the scope's tenant, newest first.
    async fn list(&mut self, include_archived: bool) -> Result<Vec<Document>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Identity-deduplicated set of documents touched in one scope, with their
/// pending facts.
///
/// Events move `staged -> committed` on [`SeenDocuments::commit`] and leave the
/// ledger through [`SeenDocuments::drain`], FIFO per document.
#[derive(Debug, Default)]
pub struct SeenDocuments {
    order: Vec<DocumentId>,
    staged: HashMap<DocumentId, Vec<DomainEvent>>,
    committed: HashMap<DocumentId, VecDeque<DomainEvent>>,
}

impl SeenDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, id: DocumentId) {
        if !self.order.contains(&id) {
            self.order.push(id);
        }
    }

    pub fn stage(&mut self, id: DocumentId, events: Vec<DomainEvent>) {
        self.track(id);
        self.staged.entry(id).or_default().extend(events);
    }

    pub fn commit(&mut self) {
        for (id, events) in self.staged.drain() {
            self.committed.entry(id).or_default().extend(events);
        }
    }

    pub fn discard_staged(&mut self) {
        self.staged.clear();
    }

    /// Lazily drain committed events, document by document in first-seen order.
    ///
    /// Events not pulled from the iterator stay in the ledger.
    pub fn drain(&mut self) -> DrainEvents<'_> {
        DrainEvents {
            seen: self,
            cursor: 0,
        }
    }
}

pub struct DrainEvents<'a> {
    seen: &'a mut SeenDocuments,
    cursor: usize,
}

impl Iterator for DrainEvents<'_> {
    type Item = DomainEvent;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.seen.order.get(self.cursor) {
            if let Some(event) = self.seen.committed.get_mut(id).and_then(VecDeque::pop_front) {
                return Some(event);
            }
            self.cursor += 1;
        }
        None
    }
}
