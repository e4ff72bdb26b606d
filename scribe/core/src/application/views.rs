// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Read-side views over documents.
//!
//! Views go through the same unit of work as commands, in their own short
//! scope step that never commits.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::errors::ApplicationError;
use crate::application::unit_of_work::UnitOfWork;
use crate::domain::document::{Document, DocumentId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub title: String,
    pub content_html: String,
    pub has_summary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

impl From<&Document> for DocumentView {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title.clone(),
            content_html: doc.content_html.clone(),
            has_summary: doc.summary_html.is_some(),
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            archived_at: doc.archived_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub document_id: DocumentId,
    pub summary_html: String,
}

async fn load(uow: &mut dyn UnitOfWork, id: DocumentId) -> Result<Option<Document>, ApplicationError> {
    uow.enter().await?;
    let result = match uow.documents() {
        Ok(mut documents) => documents.get(id).await.map_err(ApplicationError::from),
        Err(e) => Err(e.into()),
    };
    uow.exit().await;
    result
}

/// Active (not archived) document, or `DocumentNotFound`.
pub async fn document(uow: &mut dyn UnitOfWork, id: DocumentId) -> Result<DocumentView, ApplicationError> {
    match load(uow, id).await? {
        Some(doc) if !doc.is_archived() => Ok(DocumentView::from(&doc)),
        _ => Err(ApplicationError::DocumentNotFound(id)),
    }
}

pub async fn documents(uow: &mut dyn UnitOfWork) -> Result<Vec<DocumentView>, ApplicationError> {
    uow.enter().await?;
    let result = match uow.documents() {
        Ok(mut documents) => documents.list(false).await.map_err(ApplicationError::from),
        Err(e) => Err(e.into()),
    };
    uow.exit().await;
    Ok(result?.iter().map(DocumentView::from).collect())
}

pub async fn summary(uow: &mut dyn UnitOfWork, id: DocumentId) -> Result<SummaryView, ApplicationError> {
    let doc = load(uow, id)
        .await?
        .filter(|doc| !doc.is_archived())
        .ok_or(ApplicationError::DocumentNotFound(id))?;
    let summary_html = doc.summary_html.ok_or(ApplicationError::SummaryNotFound(id))?;
    Ok(SummaryView {
        document_id: id,
        summary_html,
    })
}

/// Content the summary pipeline works from. Archived documents are not
/// summarized.
pub async fn content_for_summary(uow: &mut dyn UnitOfWork, id: DocumentId) -> Result<String, ApplicationError> {
    load(uow, id)
        .await?
        .filter(|doc| !doc.is_archived())
        .map(|doc| doc.content_html)
        .ok_or(ApplicationError::DocumentNotFound(id))
}
