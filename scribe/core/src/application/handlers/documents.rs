// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Document command handlers: create, update and soft delete.
//!
//! Each handler runs one scope step: `enter`, load, mutate, `save` with the
//! produced event, `commit`, `exit`. The scope is exited on every path.

use async_trait::async_trait;
use tracing::info;

use crate::application::errors::ApplicationError;
use crate::application::message_bus::{CommandHandler, CommandOutput};
use crate::application::unit_of_work::UnitOfWork;
use crate::domain::commands::{Command, CommandKind, CreateDocument, SoftDeleteDocument, UpdateDocument};
use crate::domain::document::Document;

pub struct CreateDocumentHandler;

#[async_trait]
impl CommandHandler for CreateDocumentHandler {
    async fn handle(&self, command: Command, uow: &mut dyn UnitOfWork) -> Result<CommandOutput, ApplicationError> {
        let received = command.kind();
        let Command::CreateDocument(cmd) = command else {
            return Err(ApplicationError::Misrouted {
                expected: CommandKind::CreateDocument,
                received,
            });
        };
        uow.enter().await?;
        let result = create(uow, cmd).await;
        uow.exit().await;
        result
    }
}

async fn create(uow: &mut dyn UnitOfWork, cmd: CreateDocument) -> Result<CommandOutput, ApplicationError> {
    let (document, event) = Document::create(uow.tenant().clone(), cmd.title, cmd.content_html)?;
    uow.documents()?.add(&document, vec![event]).await?;
    uow.commit().await?;

    info!(document_id = %document.id, tenant = %document.tenant_id, "Document created");
    Ok(CommandOutput {
        kind: CommandKind::CreateDocument,
        document_id: document.id,
    })
}

pub struct UpdateDocumentHandler;

#[async_trait]
impl CommandHandler for UpdateDocumentHandler {
    async fn handle(&self, command: Command, uow: &mut dyn UnitOfWork) -> Result<CommandOutput, ApplicationError> {
        let received = command.kind();
        let Command::UpdateDocument(cmd) = command else {
            return Err(ApplicationError::Misrouted {
                expected: CommandKind::UpdateDocument,
                received,
            });
        };
        uow.enter().await?;
        let result = update(uow, cmd).await;
        uow.exit().await;
        result
    }
}

async fn update(uow: &mut dyn UnitOfWork, cmd: UpdateDocument) -> Result<CommandOutput, ApplicationError> {
    let mut documents = uow.documents()?;
    let mut document = documents
        .get(cmd.id)
        .await?
        .ok_or(ApplicationError::DocumentNotFound(cmd.id))?;
    let event = document.update(cmd.title, cmd.content_html)?;
    documents.save(&document, vec![event]).await?;
    drop(documents);
    uow.commit().await?;

    info!(document_id = %document.id, "Document updated");
    Ok(CommandOutput {
        kind: CommandKind::UpdateDocument,
        document_id: document.id,
    })
}

pub struct SoftDeleteDocumentHandler;

#[async_trait]
impl CommandHandler for SoftDeleteDocumentHandler {
    async fn handle(&self, command: Command, uow: &mut dyn UnitOfWork) -> Result<CommandOutput, ApplicationError> {
        let received = command.kind();
        let Command::SoftDeleteDocument(cmd) = command else {
            return Err(ApplicationError::Misrouted {
                expected: CommandKind::SoftDeleteDocument,
                received,
            });
        };
        uow.enter().await?;
        let result = soft_delete(uow, cmd).await;
        uow.exit().await;
        result
    }
}

async fn soft_delete(uow: &mut dyn UnitOfWork, cmd: SoftDeleteDocument) -> Result<CommandOutput, ApplicationError> {
    let mut documents = uow.documents()?;
    let mut document = documents
        .get(cmd.id)
        .await?
        .ok_or(ApplicationError::DocumentNotFound(cmd.id))?;
    let event = document.soft_delete()?;
    documents.save(&document, vec![event]).await?;
    drop(documents);
    uow.commit().await?;

    info!(document_id = %document.id, "Document archived");
    Ok(CommandOutput {
        kind: CommandKind::SoftDeleteDocument,
        document_id: document.id,
    })
}
