// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Message
//!
//! The closed set of values the message bus accepts. Anything that is neither a
//! [`Command`] nor a [`DomainEvent`] is rejected at decode time, so the bus
//! itself never sees an unrecognized shape.

use thiserror::Error;

use crate::domain::commands::{Command, CommandKind};
use crate::domain::events::{DomainEvent, EventKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Command(Command),
    Event(DomainEvent),
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Unrecognized message type '{0}'")]
    Unrecognized(String),

    #[error("Malformed payload for '{kind}': {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Message {
    /// Decode a wire-level `(type, payload)` pair.
    ///
    /// Command types use the [`CommandKind`] names (`create_document`), event
    /// types use the [`EventKind`] names (`summary_saved`).
    pub fn decode(kind: &str, payload: serde_json::Value) -> Result<Self, MessageError> {
        let malformed = |source| MessageError::Malformed {
            kind: kind.to_string(),
            source,
        };

        if CommandKind::parse(kind).is_some() {
            let envelope = serde_json::json!({ "type": kind, "payload": payload });
            return serde_json::from_value(envelope)
                .map(Message::Command)
                .map_err(malformed);
        }

        if EventKind::ALL.iter().any(|k| k.as_str() == kind) {
            let envelope = serde_json::json!({ "name": kind, "body": payload });
            return serde_json::from_value(envelope)
                .map(Message::Event)
                .map_err(malformed);
        }

        Err(MessageError::Unrecognized(kind.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Message::Command(cmd) => cmd.kind().as_str(),
            Message::Event(event) => event.name(),
        }
    }
}

impl From<Command> for Message {
    fn from(cmd: Command) -> Self {
        Message::Command(cmd)
    }
}

impl From<DomainEvent> for Message {
    fn from(event: DomainEvent) -> Self {
        Message::Event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::DocumentId;

    #[test]
    fn test_decode_command() {
        let msg = Message::decode(
            "create_document",
            serde_json::json!({"title": "Notes", "content_html": "<p>hi</p>"}),
        )
        .unwrap();
        assert!(matches!(msg, Message::Command(Command::CreateDocument(_))));
        assert_eq!(msg.name(), "create_document");
    }

    #[test]
    fn test_decode_event() {
        let id = DocumentId::new();
        let msg = Message::decode(
            "summary_deleted",
            serde_json::json!({
                "document_id": id.to_string(),
                "tenant_id": "acme",
                "deleted_at": "2026-01-01T00:00:00Z"
            }),
        )
        .unwrap();
        match msg {
            Message::Event(event) => assert_eq!(event.document_id(), id),
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let err = Message::decode("launch_rocket", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, MessageError::Unrecognized(ref k) if k == "launch_rocket"));
    }

    #[test]
    fn test_decode_reports_malformed_payload() {
        let err = Message::decode("soft_delete_document", serde_json::json!({"id": 7})).unwrap_err();
        assert!(matches!(err, MessageError::Malformed { .. }));
    }
}
