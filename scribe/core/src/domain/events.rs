// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain events: immutable facts recorded by aggregates after a legal state
//! transition. Events are only ever constructed by [`Document`] methods; every
//! variant is `#[non_exhaustive]`, so code outside this crate can read them
//! but not build them.
//!
//! [`Document`]: crate::domain::document::Document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::document::DocumentId;
use crate::domain::tenant::TenantId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "body", rename_all = "snake_case")]
pub enum DomainEvent {
    #[non_exhaustive]
    DocumentCreated {
        document_id: DocumentId,
        tenant_id: TenantId,
        title: String,
        created_at: DateTime<Utc>,
    },
    #[non_exhaustive]
    DocumentUpdated {
        document_id: DocumentId,
        tenant_id: TenantId,
        title: String,
        content_changed: bool,
        updated_at: DateTime<Utc>,
    },
    #[non_exhaustive]
    DocumentArchived {
        document_id: DocumentId,
        tenant_id: TenantId,
        archived_at: DateTime<Utc>,
    },
    #[non_exhaustive]
    SummarySaved {
        document_id: DocumentId,
        tenant_id: TenantId,
        saved_at: DateTime<Utc>,
    },
    #[non_exhaustive]
    SummaryUpdated {
        document_id: DocumentId,
        tenant_id: TenantId,
        updated_at: DateTime<Utc>,
    },
    #[non_exhaustive]
    SummaryDeleted {
        document_id: DocumentId,
        tenant_id: TenantId,
        deleted_at: DateTime<Utc>,
    },
}

/// Variant tag used as the key of the event handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    DocumentCreated,
    DocumentUpdated,
    DocumentArchived,
    SummarySaved,
    SummaryUpdated,
    SummaryDeleted,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::DocumentCreated,
        EventKind::DocumentUpdated,
        EventKind::DocumentArchived,
        EventKind::SummarySaved,
        EventKind::SummaryUpdated,
        EventKind::SummaryDeleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DocumentCreated => "document_created",
            EventKind::DocumentUpdated => "document_updated",
            EventKind::DocumentArchived => "document_archived",
            EventKind::SummarySaved => "summary_saved",
            EventKind::SummaryUpdated => "summary_updated",
            EventKind::SummaryDeleted => "summary_deleted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::DocumentCreated { .. } => EventKind::DocumentCreated,
            DomainEvent::DocumentUpdated { .. } => EventKind::DocumentUpdated,
            DomainEvent::DocumentArchived { .. } => EventKind::DocumentArchived,
            DomainEvent::SummarySaved { .. } => EventKind::SummarySaved,
            DomainEvent::SummaryUpdated { .. } => EventKind::SummaryUpdated,
            DomainEvent::SummaryDeleted { .. } => EventKind::SummaryDeleted,
        }
    }

    /// Stable event name, e.g. `summary_saved`.
    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Field map of the event, without the name.
    pub fn body(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(mut map)) => {
                map.remove("body").unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::Null,
        }
    }

    pub fn document_id(&self) -> DocumentId {
        match self {
            DomainEvent::DocumentCreated { document_id, .. }
            | DomainEvent::DocumentUpdated { document_id, .. }
            | DomainEvent::DocumentArchived { document_id, .. }
            | DomainEvent::SummarySaved { document_id, .. }
            | DomainEvent::SummaryUpdated { document_id, .. }
            | DomainEvent::SummaryDeleted { document_id, .. } => *document_id,
        }
    }

    pub fn tenant_id(&self) -> &TenantId {
        match self {
            DomainEvent::DocumentCreated { tenant_id, .. }
            | DomainEvent::DocumentUpdated { tenant_id, .. }
            | DomainEvent::DocumentArchived { tenant_id, .. }
            | DomainEvent::SummarySaved { tenant_id, .. }
            | DomainEvent::SummaryUpdated { tenant_id, .. }
            | DomainEvent::SummaryDeleted { tenant_id, .. } => tenant_id,
        }
    }
}
