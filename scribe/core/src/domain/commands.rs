// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Commands
//!
//! Validated requests to change document state. A command carries only what
//! one state transition needs and never describes something that already
//! happened. Constructors validate; [`Command::validate`] re-checks values that
//! arrived through deserialization.

use serde::{Deserialize, Serialize};

use crate::domain::document::{validate_html, validate_title, DocumentId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDocument {
    pub title: String,
    pub content_html: String,
}

impl CreateDocument {
    pub fn new(title: impl Into<String>, content_html: impl Into<String>) -> Result<Self, ValidationError> {
        let cmd = Self {
            title: title.into(),
            content_html: content_html.into(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_html("content_html", &self.content_html)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDocument {
    pub id: DocumentId,
    pub title: String,
    pub content_html: String,
}

impl UpdateDocument {
    pub fn new(
        id: DocumentId,
        title: impl Into<String>,
        content_html: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let cmd = Self {
            id,
            title: title.into(),
            content_html: content_html.into(),
        };
        cmd.validate()?;
        Ok(cmd)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        validate_html("content_html", &self.content_html)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDeleteDocument {
    pub id: DocumentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSummary {
    pub document_id: DocumentId,
    pub content_html: String,
}

impl SaveSummary {
    pub fn new(document_id: DocumentId, content_html: impl Into<String>) -> Result<Self, ValidationError> {
        let cmd = Self {
            document_id,
            content_html: content_html.into(),
        };
        validate_html("content_html", &cmd.content_html)?;
        Ok(cmd)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    pub document_id: DocumentId,
    pub content_html: String,
}

impl UpdateSummary {
    pub fn new(document_id: DocumentId, content_html: impl Into<String>) -> Result<Self, ValidationError> {
        let cmd = Self {
            document_id,
            content_html: content_html.into(),
        };
        validate_html("content_html", &cmd.content_html)?;
        Ok(cmd)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSummary {
    pub document_id: DocumentId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Command {
    CreateDocument(CreateDocument),
    UpdateDocument(UpdateDocument),
    SoftDeleteDocument(SoftDeleteDocument),
    SaveSummary(SaveSummary),
    UpdateSummary(UpdateSummary),
    DeleteSummary(DeleteSummary),
}

/// Variant tag used as the key of the command handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    CreateDocument,
    UpdateDocument,
    SoftDeleteDocument,
    SaveSummary,
    UpdateSummary,
    DeleteSummary,
}

impl CommandKind {
    pub const ALL: [CommandKind; 6] = [
        CommandKind::CreateDocument,
        CommandKind::UpdateDocument,
        CommandKind::SoftDeleteDocument,
        CommandKind::SaveSummary,
        CommandKind::UpdateSummary,
        CommandKind::DeleteSummary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::CreateDocument => "create_document",
            CommandKind::UpdateDocument => "update_document",
            CommandKind::SoftDeleteDocument => "soft_delete_document",
            CommandKind::SaveSummary => "save_summary",
            CommandKind::UpdateSummary => "update_summary",
            CommandKind::DeleteSummary => "delete_summary",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl Serialize for CommandKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::CreateDocument(_) => CommandKind::CreateDocument,
            Command::UpdateDocument(_) => CommandKind::UpdateDocument,
            Command::SoftDeleteDocument(_) => CommandKind::SoftDeleteDocument,
            Command::SaveSummary(_) => CommandKind::SaveSummary,
            Command::UpdateSummary(_) => CommandKind::UpdateSummary,
            Command::DeleteSummary(_) => CommandKind::DeleteSummary,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Command::CreateDocument(cmd) => cmd.validate(),
            Command::UpdateDocument(cmd) => cmd.validate(),
            Command::SaveSummary(cmd) => validate_html("content_html", &cmd.content_html),
            Command::UpdateSummary(cmd) => validate_html("content_html", &cmd.content_html),
            Command::SoftDeleteDocument(_) | Command::DeleteSummary(_) => Ok(()),
        }
    }

    /// Document the command targets, if it already exists.
    pub fn document_id(&self) -> Option<DocumentId> {
        match self {
            Command::CreateDocument(_) => None,
            Command::UpdateDocument(cmd) => Some(cmd.id),
            Command::SoftDeleteDocument(cmd) => Some(cmd.id),
            Command::SaveSummary(cmd) => Some(cmd.document_id),
            Command::UpdateSummary(cmd) => Some(cmd.document_id),
            Command::DeleteSummary(cmd) => Some(cmd.document_id),
        }
    }
}

macro_rules! impl_from_command {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Command {
                fn from(cmd: $variant) -> Self {
                    Command::$variant(cmd)
                }
            }
        )*
    };
}

impl_from_command!(
    CreateDocument,
    UpdateDocument,
    SoftDeleteDocument,
    SaveSummary,
    UpdateSummary,
    DeleteSummary,
);
