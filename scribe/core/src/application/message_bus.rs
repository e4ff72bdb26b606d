// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Message Bus
//!
//! In-process dispatcher bound to one unit of work.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Route commands to exactly one handler and events to
//!   their ordered handler list, draining follow-up events until quiet
//! - **Collaborators:**
//!   - Application: `UnitOfWork`, `HandlerRegistry`
//!
//! # Flow
//!
//! `handle(message)` pushes the message onto a FIFO queue and drains it:
//!
//! - **Command:** validate, run its handler, record the output in `results`,
//!   then append every committed event to the back of the queue. A failing
//!   command aborts the run and the error is returned; `results` is untouched.
//! - **Event:** run each registered handler in order, appending new events
//!   after each one. Handler failures are logged and the run continues.
//!
//! Processing is breadth-first: events produced while handling a message are
//! queued behind everything already waiting.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, error, info_span, Instrument};

use crate::application::errors::ApplicationError;
use crate::application::unit_of_work::UnitOfWork;
use crate::domain::commands::{Command, CommandKind};
use crate::domain::document::{DocumentId, ValidationError};
use crate::domain::events::{DomainEvent, EventKind};
use crate::domain::message::Message;

/// Return value of a successful command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    #[serde(rename = "command")]
    pub kind: CommandKind,
    pub document_id: DocumentId,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, command: Command, uow: &mut dyn UnitOfWork) -> Result<CommandOutput, ApplicationError>;
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &DomainEvent, uow: &mut dyn UnitOfWork) -> Result<(), ApplicationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("No handler registered for command '{0}'")]
    MissingCommandHandler(CommandKind),

    #[error("More than one handler registered for command '{0}'")]
    DuplicateCommandHandler(CommandKind),
}

/// Static dispatch table built once at startup
pub struct HandlerRegistry {
    commands: HashMap<CommandKind, Arc<dyn CommandHandler>>,
    events: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    pub fn command_handler(&self, kind: CommandKind) -> Option<&Arc<dyn CommandHandler>> {
        self.commands.get(&kind)
    }

    pub fn event_handlers(&self, kind: EventKind) -> &[Arc<dyn EventHandler>] {
        self.events.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Default)]
pub struct HandlerRegistryBuilder {
    commands: Vec<(CommandKind, Arc<dyn CommandHandler>)>,
    events: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistryBuilder {
    pub fn command(mut self, kind: CommandKind, handler: Arc<dyn CommandHandler>) -> Self {
        self.commands.push((kind, handler));
        self
    }

    /// Handlers for one event kind run in registration order.
    pub fn event(mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        self.events.entry(kind).or_default().push(handler);
        self
    }

    /// Register `handler` for every event kind.
    pub fn every_event(mut self, handler: Arc<dyn EventHandler>) -> Self {
        for kind in EventKind::ALL {
            self.events.entry(kind).or_default().push(Arc::clone(&handler));
        }
        self
    }

    /// Fails unless every command kind has exactly one handler.
    pub fn build(self) -> Result<HandlerRegistry, RegistryError> {
        let mut commands = HashMap::new();
        for (kind, handler) in self.commands {
            if commands.insert(kind, handler).is_some() {
                return Err(RegistryError::DuplicateCommandHandler(kind));
            }
        }
        if let Some(missing) = CommandKind::ALL.into_iter().find(|k| !commands.contains_key(k)) {
            return Err(RegistryError::MissingCommandHandler(missing));
        }
        Ok(HandlerRegistry {
            commands,
            events: self.events,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Invalid command '{kind}': {source}")]
    Validation {
        kind: CommandKind,
        #[source]
        source: ValidationError,
    },

    #[error("No handler registered for command '{0}'")]
    NoHandler(CommandKind),

    #[error("Command '{kind}' failed: {source}")]
    Command {
        kind: CommandKind,
        #[source]
        source: ApplicationError,
    },
}

/// Dispatcher for one bus run
pub struct MessageBus {
    uow: Box<dyn UnitOfWork>,
    handlers: Arc<HandlerRegistry>,
    queue: VecDeque<Message>,
    results: Vec<CommandOutput>,
}

impl MessageBus {
    pub fn new(uow: Box<dyn UnitOfWork>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            uow,
            handlers,
            queue: VecDeque::new(),
            results: Vec::new(),
        }
    }

    /// Outputs of successfully handled commands, in handling order
    pub fn results(&self) -> &[CommandOutput] {
        &self.results
    }

    pub fn unit_of_work(&mut self) -> &mut dyn UnitOfWork {
        self.uow.as_mut()
    }

    pub async fn handle(&mut self, message: impl Into<Message>) -> Result<(), BusError> {
        let message = message.into();
        let span = info_span!("bus_run", tenant = %self.uow.tenant(), message = message.name());
        self.queue.push_back(message);
        self.drain().instrument(span).await
    }

    async fn drain(&mut self) -> Result<(), BusError> {
        while let Some(message) = self.queue.pop_front() {
            match message {
                Message::Command(command) => {
                    if let Err(e) = self.handle_command(command).await {
                        self.queue.clear();
                        return Err(e);
                    }
                }
                Message::Event(event) => self.handle_event(event).await,
            }
        }
        Ok(())
    }

    async fn handle_command(&mut self, command: Command) -> Result<(), BusError> {
        let kind = command.kind();
        command
            .validate()
            .map_err(|source| BusError::Validation { kind, source })?;

        let handler = self
            .handlers
            .command_handler(kind)
            .cloned()
            .ok_or(BusError::NoHandler(kind))?;

        debug!(command = %kind, "Handling command");
        let output = handler
            .handle(command, self.uow.as_mut())
            .await
            .map_err(|source| BusError::Command { kind, source })?;

        self.results.push(output);
        self.queue.extend(self.uow.collect_new_events().map(Message::Event));
        Ok(())
    }

    async fn handle_event(&mut self, event: DomainEvent) {
        let handlers = Arc::clone(&self.handlers);
        for handler in handlers.event_handlers(event.kind()) {
            debug!(event = event.name(), handler = handler.name(), "Handling event");
            if let Err(e) = handler.handle(&event, self.uow.as_mut()).await {
                error!(
                    event = event.name(),
                    handler = handler.name(),
                    document_id = %event.document_id(),
                    error = %e,
                    "Event handler failed"
                );
            }
            self.queue.extend(self.uow.collect_new_events().map(Message::Event));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers;
    use crate::domain::commands::{CreateDocument, SaveSummary, UpdateDocument};
    use crate::domain::tenant::TenantId;
    use crate::infrastructure::unit_of_work::in_memory::{InMemoryDocumentStore, InMemoryUnitOfWork};
    use std::sync::Mutex;

    /// Records every event it sees; optionally fails on one kind.
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_on: Option<EventKind>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn handle(&self, event: &DomainEvent, _uow: &mut dyn UnitOfWork) -> Result<(), ApplicationError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event.name()));
            if self.fail_on == Some(event.kind()) {
                return Err(ApplicationError::DocumentNotFound(event.document_id()));
            }
            Ok(())
        }
    }

    /// Saves a summary whenever a document is created: a second-order fact.
    struct AutoSummary;

    #[async_trait]
    impl EventHandler for AutoSummary {
        fn name(&self) -> &'static str {
            "auto_summary"
        }

        async fn handle(&self, event: &DomainEvent, uow: &mut dyn UnitOfWork) -> Result<(), ApplicationError> {
            uow.enter().await?;
            let result = async {
                let mut repo = uow.documents()?;
                let mut doc = repo
                    .get(event.document_id())
                    .await?
                    .ok_or(ApplicationError::DocumentNotFound(event.document_id()))?;
                let saved = doc.save_summary("<p>auto</p>")?;
                repo.save(&doc, vec![saved]).await?;
                drop(repo);
                uow.commit().await?;
                Ok::<_, ApplicationError>(())
            }
            .await;
            uow.exit().await;
            result
        }
    }

    fn store() -> InMemoryDocumentStore {
        InMemoryDocumentStore::new()
    }

    fn uow(store: &InMemoryDocumentStore) -> Box<dyn UnitOfWork> {
        Box::new(InMemoryUnitOfWork::new(store.clone(), TenantId::new("acme").unwrap()))
    }

    fn base_registry() -> HandlerRegistryBuilder {
        handlers::register_command_handlers(HandlerRegistry::builder())
    }

    #[tokio::test]
    async fn test_registry_requires_every_command() {
        let err = HandlerRegistry::builder().build().err().unwrap();
        assert!(matches!(err, RegistryError::MissingCommandHandler(_)));

        let handler: Arc<dyn CommandHandler> = Arc::new(handlers::documents::CreateDocumentHandler);
        let err = base_registry()
            .command(CommandKind::CreateDocument, handler)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RegistryError::DuplicateCommandHandler(CommandKind::CreateDocument)));
    }

    #[tokio::test]
    async fn test_events_fan_out_breadth_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::new(Recorder { label: "first", log: log.clone(), fail_on: None });
        let second = Arc::new(Recorder { label: "second", log: log.clone(), fail_on: None });
        let registry = base_registry()
            .event(EventKind::DocumentCreated, first.clone())
            .event(EventKind::DocumentCreated, Arc::new(AutoSummary))
            .event(EventKind::DocumentCreated, second.clone())
            .event(EventKind::SummarySaved, first)
            .build()
            .unwrap();

        let store = store();
        let mut bus = MessageBus::new(uow(&store), Arc::new(registry));
        bus.handle(Command::from(CreateDocument::new("A", "<p>a</p>").unwrap()))
            .await
            .unwrap();

        // SummarySaved is produced while DocumentCreated is being handled, but
        // is only processed once every DocumentCreated handler has run.
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:document_created", "second:document_created", "first:summary_saved"]
        );
        assert_eq!(bus.results().len(), 1);
        assert_eq!(bus.results()[0].kind, CommandKind::CreateDocument);
    }

    #[tokio::test]
    async fn test_failing_event_handler_is_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = Arc::new(Recorder {
            label: "failing",
            log: log.clone(),
            fail_on: Some(EventKind::DocumentCreated),
        });
        let after = Arc::new(Recorder { label: "after", log: log.clone(), fail_on: None });
        let registry = base_registry()
            .every_event(failing)
            .every_event(after)
            .build()
            .unwrap();

        let store = store();
        let mut bus = MessageBus::new(uow(&store), Arc::new(registry));
        let result = bus.handle(Command::from(CreateDocument::new("A", "<p>a</p>").unwrap())).await;
        assert!(result.is_ok());

        let created = bus.results()[0].document_id;
        bus.handle(Command::from(SaveSummary::new(created, "<p>s</p>").unwrap()))
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "failing:document_created",
                "after:document_created",
                "failing:summary_saved",
                "after:summary_saved",
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_command_leaves_results_unchanged() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::new(Recorder { label: "rec", log: log.clone(), fail_on: None });
        let registry = base_registry().every_event(recorder).build().unwrap();

        let store = store();
        let mut bus = MessageBus::new(uow(&store), Arc::new(registry));
        bus.handle(Command::from(CreateDocument::new("A", "<p>a</p>").unwrap()))
            .await
            .unwrap();
        let before = bus.results().to_vec();

        let missing = DocumentId::new();
        let err = bus
            .handle(Command::from(UpdateDocument::new(missing, "B", "<p>b</p>").unwrap()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BusError::Command { kind: CommandKind::UpdateDocument, source: ApplicationError::DocumentNotFound(id) } if id == missing
        ));
        assert_eq!(bus.results(), before.as_slice());
        assert_eq!(*log.lock().unwrap(), vec!["rec:document_created"]);
    }

    #[tokio::test]
    async fn test_invalid_command_rejected_before_handler() {
        let registry = base_registry().build().unwrap();
        let store = store();
        let mut bus = MessageBus::new(uow(&store), Arc::new(registry));

        let command: Command = serde_json::from_value(serde_json::json!({
            "type": "create_document",
            "payload": {"title": "", "content_html": "<p>x</p>"}
        }))
        .unwrap();
        let err = bus.handle(command).await.unwrap_err();

        assert!(matches!(err, BusError::Validation { kind: CommandKind::CreateDocument, .. }));
        assert!(bus.results().is_empty());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_each_command_delivers_its_events_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::new(Recorder { label: "rec", log: log.clone(), fail_on: None });
        let registry = Arc::new(base_registry().every_event(recorder).build().unwrap());

        let store = store();
        let mut bus = MessageBus::new(uow(&store), registry);
        for title in ["A", "B", "C"] {
            bus.handle(Command::from(CreateDocument::new(title, "<p>x</p>").unwrap()))
                .await
                .unwrap();
        }

        assert_eq!(log.lock().unwrap().len(), 3);
        assert_eq!(bus.results().len(), 3);
        assert_eq!(bus.unit_of_work().collect_new_events().count(), 0);
    }
}
