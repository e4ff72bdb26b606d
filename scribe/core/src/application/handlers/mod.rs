// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command and event handlers, and the wiring that puts them in a
//! `HandlerRegistry`.

pub mod documents;
pub mod events;
pub mod summaries;

use std::sync::Arc;

use crate::application::message_bus::HandlerRegistryBuilder;
use crate::domain::commands::CommandKind;
use crate::domain::config::SummariesConfig;
use crate::domain::events::EventKind;
use crate::infrastructure::event_bus::EventBus;

/// One handler per command kind.
pub fn register_command_handlers(builder: HandlerRegistryBuilder) -> HandlerRegistryBuilder {
    builder
        .command(CommandKind::CreateDocument, Arc::new(documents::CreateDocumentHandler))
        .command(CommandKind::UpdateDocument, Arc::new(documents::UpdateDocumentHandler))
        .command(CommandKind::SoftDeleteDocument, Arc::new(documents::SoftDeleteDocumentHandler))
        .command(CommandKind::SaveSummary, Arc::new(summaries::SaveSummaryHandler))
        .command(CommandKind::UpdateSummary, Arc::new(summaries::UpdateSummaryHandler))
        .command(CommandKind::DeleteSummary, Arc::new(summaries::DeleteSummaryHandler))
}

/// Audit and broadcast every fact; invalidate summaries when enabled.
pub fn register_event_handlers(
    builder: HandlerRegistryBuilder,
    summaries: &SummariesConfig,
    event_bus: Arc<EventBus>,
) -> HandlerRegistryBuilder {
    let builder = builder
        .every_event(Arc::new(events::AuditTrailHandler))
        .every_event(Arc::new(events::EventBroadcastHandler::new(event_bus)));

    if summaries.invalidate_on_update {
        builder.event(EventKind::DocumentUpdated, Arc::new(events::SummaryInvalidationHandler))
    } else {
        builder
    }
}
