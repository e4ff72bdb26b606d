// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Built-in event handlers.
//!
//! | Handler | Events | Effect |
//! |---------|--------|--------|
//! | `AuditTrailHandler` | all | structured `info` log line per fact |
//! | `EventBroadcastHandler` | all | republish on the in-process `EventBus` |
//! | `SummaryInvalidationHandler` | `DocumentUpdated` | clear a stale summary |

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::application::errors::ApplicationError;
use crate::application::message_bus::EventHandler;
use crate::application::unit_of_work::UnitOfWork;
use crate::domain::events::DomainEvent;
use crate::infrastructure::event_bus::EventBus;

pub struct AuditTrailHandler;

#[async_trait]
impl EventHandler for AuditTrailHandler {
    fn name(&self) -> &'static str {
        "audit_trail"
    }

    async fn handle(&self, event: &DomainEvent, _uow: &mut dyn UnitOfWork) -> Result<(), ApplicationError> {
        info!(
            event = event.name(),
            tenant = %event.tenant_id(),
            document_id = %event.document_id(),
            body = %event.body(),
            "Domain event"
        );
        Ok(())
    }
}

pub struct EventBroadcastHandler {
    event_bus: Arc<EventBus>,
}

impl EventBroadcastHandler {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self { event_bus }
    }
}

#[async_trait]
impl EventHandler for EventBroadcastHandler {
    fn name(&self) -> &'static str {
        "event_broadcast"
    }

    async fn handle(&self, event: &DomainEvent, _uow: &mut dyn UnitOfWork) -> Result<(), ApplicationError> {
        self.event_bus.publish(event.clone());
        Ok(())
    }
}

/// Drops the stored summary when a document's content changes, producing
/// `SummaryDeleted`.
pub struct SummaryInvalidationHandler;

#[async_trait]
impl EventHandler for SummaryInvalidationHandler {
    fn name(&self) -> &'static str {
        "summary_invalidation"
    }

    async fn handle(&self, event: &DomainEvent, uow: &mut dyn UnitOfWork) -> Result<(), ApplicationError> {
        let DomainEvent::DocumentUpdated {
            document_id,
            content_changed: true,
            ..
        } = event
        else {
            return Ok(());
        };

        uow.enter().await?;
        let result = invalidate(uow, *document_id).await;
        uow.exit().await;
        result
    }
}

async fn invalidate(
    uow: &mut dyn UnitOfWork,
    document_id: crate::domain::document::DocumentId,
) -> Result<(), ApplicationError> {
    let mut documents = uow.documents()?;
    let Some(mut document) = documents.get(document_id).await? else {
        return Err(ApplicationError::DocumentNotFound(document_id));
    };
    if document.summary_html.is_none() || document.is_archived() {
        debug!(document_id = %document_id, "No summary to invalidate");
        return Ok(());
    }
    let event = document.delete_summary()?;
    documents.save(&document, vec![event]).await?;
    drop(documents);
    uow.commit().await?;

    info!(document_id = %document_id, "Stale summary invalidated");
    Ok(())
}
