// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus - fan-out of committed domain events
//
// The message bus publishes here only after a fact has been committed, so
// observers never see rolled-back work. Delivery is best effort: nothing is
// persisted and a receiver that falls behind loses the oldest events.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::document::DocumentId;
use crate::domain::events::DomainEvent;
use crate::domain::tenant::TenantId;

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// `capacity` events are buffered per receiver before the oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, event: DomainEvent) {
        let name = event.name();
        let document_id = event.document_id();
        match self.sender.send(event) {
            Ok(receivers) => debug!(event = name, document_id = %document_id, receivers, "Event published"),
            Err(_) => debug!(event = name, document_id = %document_id, "Event published with no observers"),
        }
    }

    /// Every committed event, across tenants
    pub fn subscribe(&self) -> EventReceiver {
        self.subscribe_filtered(EventFilter::All)
    }

    /// Committed events of one tenant
    pub fn subscribe_tenant(&self, tenant: TenantId) -> EventReceiver {
        self.subscribe_filtered(EventFilter::Tenant(tenant))
    }

    /// Committed events of one document
    pub fn subscribe_document(&self, document_id: DocumentId) -> EventReceiver {
        self.subscribe_filtered(EventFilter::Document(document_id))
    }

    fn subscribe_filtered(&self, filter: EventFilter) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EventFilter {
    All,
    Tenant(TenantId),
    Document(DocumentId),
}

impl EventFilter {
    fn matches(&self, event: &DomainEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Tenant(tenant) => event.tenant_id() == tenant,
            EventFilter::Document(id) => event.document_id() == *id,
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    filter: EventFilter,
}

impl EventReceiver {
    /// Wait for the next matching event
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(|e| match e {
                broadcast::error::RecvError::Closed => EventBusError::Closed,
                broadcast::error::RecvError::Lagged(n) => lagged(n),
            })?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already buffered, without waiting
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        loop {
            let event = self.receiver.try_recv().map_err(|e| match e {
                broadcast::error::TryRecvError::Empty => EventBusError::Empty,
                broadcast::error::TryRecvError::Closed => EventBusError::Closed,
                broadcast::error::TryRecvError::Lagged(n) => lagged(n),
            })?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }
}

fn lagged(missed: u64) -> EventBusError {
    warn!(missed, "Event receiver fell behind; oldest events dropped");
    EventBusError::Lagged(missed)
}

#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
