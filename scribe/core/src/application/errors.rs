// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Errors raised by command and event handlers.

use crate::application::unit_of_work::UnitOfWorkError;
use crate::domain::commands::CommandKind;
use crate::domain::document::{DocumentError, DocumentId, ValidationError};
use crate::domain::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Document {0} not found")]
    DocumentNotFound(DocumentId),

    #[error("Summary for document {0} not found")]
    SummaryNotFound(DocumentId),

    #[error("Document {0} is archived and can no longer be modified")]
    Archived(DocumentId),

    #[error("Handler for '{expected}' received '{received}'")]
    Misrouted {
        expected: CommandKind,
        received: CommandKind,
    },

    #[error(transparent)]
    UnitOfWork(#[from] UnitOfWorkError),
}

impl From<DocumentError> for ApplicationError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Archived(id) => ApplicationError::Archived(id),
            DocumentError::NoSummary(id) => ApplicationError::SummaryNotFound(id),
            DocumentError::Validation(e) => ApplicationError::Validation(e),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        ApplicationError::UnitOfWork(UnitOfWorkError::Repository(err))
    }
}

/// Error taxonomy used at the edges (HTTP status, CLI exit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Conflict,
    Unexpected,
}

impl ApplicationError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ApplicationError::Validation(_) => ErrorClass::Validation,
            ApplicationError::DocumentNotFound(_) | ApplicationError::SummaryNotFound(_) => ErrorClass::NotFound,
            ApplicationError::Archived(_) => ErrorClass::Conflict,
            ApplicationError::Misrouted { .. } | ApplicationError::UnitOfWork(_) => ErrorClass::Unexpected,
        }
    }
}
