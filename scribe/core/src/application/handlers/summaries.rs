// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Summary command handlers: save, update and delete a document's summary.

use async_trait::async_trait;
use tracing::info;

use crate::application::errors::ApplicationError;
use crate::application::message_bus::{CommandHandler, CommandOutput};
use crate::application::unit_of_work::UnitOfWork;
use crate::domain::commands::{Command, CommandKind};
use crate::domain::document::{Document, DocumentError, DocumentId};
use crate::domain::events::DomainEvent;

/// Load a document, apply `mutate`, stage the event and commit.
async fn mutate_summary(
    uow: &mut dyn UnitOfWork,
    kind: CommandKind,
    document_id: DocumentId,
    mutate: impl FnOnce(&mut Document) -> Result<DomainEvent, DocumentError> + Send,
) -> Result<CommandOutput, ApplicationError> {
    let mut documents = uow.documents()?;
    let mut document = documents
        .get(document_id)
        .await?
        .ok_or(ApplicationError::DocumentNotFound(document_id))?;
    let event = mutate(&mut document)?;
    documents.save(&document, vec![event]).await?;
    drop(documents);
    uow.commit().await?;

    info!(document_id = %document_id, command = %kind, "Summary changed");
    Ok(CommandOutput { kind, document_id })
}

pub struct SaveSummaryHandler;

#[async_trait]
impl CommandHandler for SaveSummaryHandler {
    async fn handle(&self, command: Command, uow: &mut dyn UnitOfWork) -> Result<CommandOutput, ApplicationError> {
        let received = command.kind();
        let Command::SaveSummary(cmd) = command else {
            return Err(ApplicationError::Misrouted {
                expected: CommandKind::SaveSummary,
                received,
            });
        };
        uow.enter().await?;
        let result = mutate_summary(uow, received, cmd.document_id, |doc| doc.save_summary(cmd.content_html)).await;
        uow.exit().await;
        result
    }
}

pub struct UpdateSummaryHandler;

#[async_trait]
impl CommandHandler for UpdateSummaryHandler {
    async fn handle(&self, command: Command, uow: &mut dyn UnitOfWork) -> Result<CommandOutput, ApplicationError> {
        let received = command.kind();
        let Command::UpdateSummary(cmd) = command else {
            return Err(ApplicationError::Misrouted {
                expected: CommandKind::UpdateSummary,
                received,
            });
        };
        uow.enter().await?;
        let result = mutate_summary(uow, received, cmd.document_id, |doc| doc.update_summary(cmd.content_html)).await;
        uow.exit().await;
        result
    }
}

pub struct DeleteSummaryHandler;

#[async_trait]
impl CommandHandler for DeleteSummaryHandler {
    async fn handle(&self, command: Command, uow: &mut dyn UnitOfWork) -> Result<CommandOutput, ApplicationError> {
        let received = command.kind();
        let Command::DeleteSummary(cmd) = command else {
            return Err(ApplicationError::Misrouted {
                expected: CommandKind::DeleteSummary,
                received,
            });
        };
        uow.enter().await?;
        let result = mutate_summary(uow, received, cmd.document_id, Document::delete_summary).await;
        uow.exit().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::documents::CreateDocumentHandler;
    use crate::domain::commands::{CreateDocument, DeleteSummary, SaveSummary, UpdateSummary};
    use crate::domain::tenant::TenantId;
    use crate::infrastructure::unit_of_work::in_memory::{InMemoryDocumentStore, InMemoryUnitOfWork};

    async fn setup() -> (InMemoryDocumentStore, InMemoryUnitOfWork, DocumentId) {
        let store = InMemoryDocumentStore::new();
        let mut uow = InMemoryUnitOfWork::new(store.clone(), TenantId::new("acme").unwrap());
        let cmd = CreateDocument::new("Title", "<p>body</p>").unwrap();
        let id = CreateDocumentHandler.handle(cmd.into(), &mut uow).await.unwrap().document_id;
        let _ = uow.collect_new_events().count();
        (store, uow, id)
    }

    #[tokio::test]
    async fn test_summary_save_update_delete() {
        let (store, mut uow, id) = setup().await;

        SaveSummaryHandler
            .handle(SaveSummary::new(id, "<p>one</p>").unwrap().into(), &mut uow)
            .await
            .unwrap();
        UpdateSummaryHandler
            .handle(UpdateSummary::new(id, "<p>two</p>").unwrap().into(), &mut uow)
            .await
            .unwrap();
        assert_eq!(
            store.get(&id).await.and_then(|d| d.summary_html),
            Some("<p>two</p>".to_string())
        );

        DeleteSummaryHandler
            .handle(DeleteSummary { document_id: id }.into(), &mut uow)
            .await
            .unwrap();
        assert!(store.get(&id).await.unwrap().summary_html.is_none());

        let names: Vec<_> = uow.collect_new_events().map(|e| e.name()).collect();
        assert_eq!(names, vec!["summary_saved", "summary_updated", "summary_deleted"]);
    }

    #[tokio::test]
    async fn test_delete_missing_summary_is_not_found() {
        let (_store, mut uow, id) = setup().await;
        let err = DeleteSummaryHandler
            .handle(DeleteSummary { document_id: id }.into(), &mut uow)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::SummaryNotFound(_)));
    }
}
