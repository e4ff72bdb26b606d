// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Document
//!
//! The `Document` aggregate root and its field rules.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Owns document state transitions and the facts they produce
//!
//! Every mutating method checks its guard first and only then changes state,
//! returning the [`DomainEvent`] describing what happened. The caller hands the
//! event to the repository together with the document (`save(doc, events)`);
//! documents themselves never hold a pending-event queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::DomainEvent;
use crate::domain::tenant::TenantId;

pub const TITLE_MAX_CHARS: usize = 255;
pub const CONTENT_MAX_CHARS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Malformed input, rejected before any handler runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters (got {actual})")]
    TooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    validate_length("title", title, TITLE_MAX_CHARS)
}

pub fn validate_html(field: &'static str, html: &str) -> Result<(), ValidationError> {
    validate_length(field, html, CONTENT_MAX_CHARS)
}

fn validate_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual == 0 {
        return Err(ValidationError::Empty { field });
    }
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("Document {0} is archived and can no longer be modified")]
    Archived(DocumentId),

    #[error("Document {0} has no summary")]
    NoSummary(DocumentId),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub tenant_id: TenantId,
    pub title: String,
    pub content_html: String,
    pub summary_html: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn create(
        tenant_id: TenantId,
        title: impl Into<String>,
        content_html: impl Into<String>,
    ) -> Result<(Self, DomainEvent), DocumentError> {
        let title = title.into();
        let content_html = content_html.into();
        validate_title(&title)?;
        validate_html("content_html", &content_html)?;

        let now = Utc::now();
        let document = Self {
            id: DocumentId::new(),
            tenant_id,
            title,
            content_html,
            summary_html: None,
            created_at: now,
            updated_at: now,
            archived_at: None,
        };
        let event = DomainEvent::DocumentCreated {
            document_id: document.id,
            tenant_id: document.tenant_id.clone(),
            title: document.title.clone(),
            created_at: now,
        };
        Ok((document, event))
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    fn ensure_active(&self) -> Result<(), DocumentError> {
        if self.is_archived() {
            return Err(DocumentError::Archived(self.id));
        }
        Ok(())
    }

    pub fn update(
        &mut self,
        title: impl Into<String>,
        content_html: impl Into<String>,
    ) -> Result<DomainEvent, DocumentError> {
        self.ensure_active()?;
        let title = title.into();
        let content_html = content_html.into();
        validate_title(&title)?;
        validate_html("content_html", &content_html)?;

        let content_changed = self.content_html != content_html;
        let now = Utc::now();
        self.title = title;
        self.content_html = content_html;
        self.updated_at = now;

        Ok(DomainEvent::DocumentUpdated {
            document_id: self.id,
            tenant_id: self.tenant_id.clone(),
            title: self.title.clone(),
            content_changed,
            updated_at: now,
        })
    }

    /// Archive the document. Archival is terminal.
    pub fn soft_delete(&mut self) -> Result<DomainEvent, DocumentError> {
        self.ensure_active()?;
        let now = Utc::now();
        self.archived_at = Some(now);
        self.updated_at = now;

        Ok(DomainEvent::DocumentArchived {
            document_id: self.id,
            tenant_id: self.tenant_id.clone(),
            archived_at: now,
        })
    }

    pub fn save_summary(&mut self, html: impl Into<String>) -> Result<DomainEvent, DocumentError> {
        self.ensure_active()?;
        let html = html.into();
        validate_html("summary_html", &html)?;
        let now = Utc::now();
        self.summary_html = Some(html);
        self.updated_at = now;

        Ok(DomainEvent::SummarySaved {
            document_id: self.id,
            tenant_id: self.tenant_id.clone(),
            saved_at: now,
        })
    }

    pub fn update_summary(&mut self, html: impl Into<String>) -> Result<DomainEvent, DocumentError> {
        self.ensure_active()?;
        let html = html.into();
        validate_html("summary_html", &html)?;
        let now = Utc::now();
        self.summary_html = Some(html);
        self.updated_at = now;

        Ok(DomainEvent::SummaryUpdated {
            document_id: self.id,
            tenant_id: self.tenant_id.clone(),
            updated_at: now,
        })
    }

    pub fn delete_summary(&mut self) -> Result<DomainEvent, DocumentError> {
        self.ensure_active()?;
        if self.summary_html.is_none() {
            return Err(DocumentError::NoSummary(self.id));
        }
        let now = Utc::now();
        self.summary_html = None;
        self.updated_at = now;

        Ok(DomainEvent::SummaryDeleted {
            document_id: self.id,
            tenant_id: self.tenant_id.clone(),
            deleted_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant() -> TenantId {
        TenantId::new("acme").unwrap()
    }

    #[test]
    fn test_create_emits_document_created() {
        let (doc, event) = Document::create(tenant(), "Title", "<p>body</p>").unwrap();
        assert_eq!(event.name(), "document_created");
        assert_eq!(event.document_id(), doc.id);
        assert!(!doc.is_archived());
        assert!(doc.summary_html.is_none());
    }

    #[test]
    fn test_create_rejects_invalid_fields() {
        let err = Document::create(tenant(), "", "<p>x</p>").unwrap_err();
        assert_eq!(err, DocumentError::Validation(ValidationError::Empty { field: "title" }));

        let long_title = "t".repeat(TITLE_MAX_CHARS + 1);
        assert!(matches!(
            Document::create(tenant(), long_title, "<p>x</p>"),
            Err(DocumentError::Validation(ValidationError::TooLong { max: 255, .. }))
        ));
    }

    #[test]
    fn test_archived_document_rejects_mutations() {
        let (mut doc, _) = Document::create(tenant(), "Title", "<p>body</p>").unwrap();
        doc.soft_delete().unwrap();

        assert_eq!(doc.update("New", "<p>new</p>"), Err(DocumentError::Archived(doc.id)));
        assert_eq!(doc.soft_delete(), Err(DocumentError::Archived(doc.id)));
        assert_eq!(doc.save_summary("<p>s</p>"), Err(DocumentError::Archived(doc.id)));
        assert_eq!(doc.delete_summary(), Err(DocumentError::Archived(doc.id)));
    }

    #[test]
    fn test_guard_checked_before_state_changes() {
        let (mut doc, _) = Document::create(tenant(), "Title", "<p>body</p>").unwrap();
        let before = doc.clone();
        assert!(doc.update("Title", "").is_err());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_summary_lifecycle() {
        let (mut doc, _) = Document::create(tenant(), "Title", "<p>body</p>").unwrap();
        assert_eq!(doc.delete_summary(), Err(DocumentError::NoSummary(doc.id)));

        assert_eq!(doc.save_summary("<p>s</p>").unwrap().name(), "summary_saved");
        assert_eq!(doc.update_summary("<p>s2</p>").unwrap().name(), "summary_updated");
        assert_eq!(doc.summary_html.as_deref(), Some("<p>s2</p>"));
        assert_eq!(doc.delete_summary().unwrap().name(), "summary_deleted");
        assert!(doc.summary_html.is_none());
    }

    #[test]
    fn test_update_reports_content_change() {
        let (mut doc, _) = Document::create(tenant(), "Title", "<p>body</p>").unwrap();
        match doc.update("Renamed", "<p>body</p>").unwrap() {
            DomainEvent::DocumentUpdated { content_changed, .. } => assert!(!content_changed),
            other => panic!("unexpected event {other:?}"),
        }
        match doc.update("Renamed", "<p>other</p>").unwrap() {
            DomainEvent::DocumentUpdated { content_changed, .. } => assert!(content_changed),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
