// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// HTTP error mapping
//
// Handlers return `ApiError`; the request-context middleware renders it as
// `{error, description, status_code, request_id, path}` once the request id
// and path are known.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::application::errors::{ApplicationError, ErrorClass};
use crate::application::message_bus::BusError;
use crate::domain::document::ValidationError;

/// Error name and description, attached to the response for rendering
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    pub error: &'static str,
    pub description: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    description: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, description: impl Into<String>) -> Self {
        Self {
            status,
            error,
            description: description.into(),
        }
    }

    pub fn not_found(description: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "ResourceNotFound", description)
    }

    pub fn missing_tenant() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "MissingTenant",
            "You don't have the required access to perform this operation.",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn from_application(err: &ApplicationError) -> Self {
        let (status, name) = match err.class() {
            ErrorClass::Validation => (StatusCode::BAD_REQUEST, "ValidationError"),
            ErrorClass::Conflict => (StatusCode::BAD_REQUEST, "ApplicationError"),
            ErrorClass::NotFound => (StatusCode::NOT_FOUND, "ResourceNotFound"),
            ErrorClass::Unexpected => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };
        Self::new(status, name, err.to_string())
    }
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        Self::from_application(&err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "ValidationError", err.to_string())
    }
}

impl From<BusError> for ApiError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Validation { source, .. } => source.into(),
            BusError::Command { source, .. } => Self::from_application(&source),
            BusError::NoHandler(kind) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                format!("No handler registered for command '{}'", kind),
            ),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "ValidationError", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(
                error = self.error,
                status_code = self.status.as_u16(),
                "Error caught with message {}",
                self.description
            );
        } else {
            warn!(
                error = self.error,
                status_code = self.status.as_u16(),
                "Error caught with message {}",
                self.description
            );
        }

        let mut response = self.status.into_response();
        response.extensions_mut().insert(ErrorDetails {
            error: self.error,
            description: self.description,
        });
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::unit_of_work::UnitOfWorkError;
    use crate::domain::commands::CommandKind;
    use crate::domain::document::DocumentId;

    #[test]
    fn test_status_mapping() {
        let id = DocumentId::new();
        let cases = [
            (ApplicationError::DocumentNotFound(id), StatusCode::NOT_FOUND),
            (ApplicationError::SummaryNotFound(id), StatusCode::NOT_FOUND),
            (ApplicationError::Archived(id), StatusCode::BAD_REQUEST),
            (
                ApplicationError::UnitOfWork(UnitOfWorkError::Storage("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }

        let bus = BusError::Command {
            kind: CommandKind::DeleteSummary,
            source: ApplicationError::SummaryNotFound(id),
        };
        assert_eq!(ApiError::from(bus).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_details_attached_to_response() {
        let response = ApiError::not_found("gone").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let details = response.extensions().get::<ErrorDetails>().unwrap();
        assert_eq!(details.error, "ResourceNotFound");
        assert_eq!(details.description, "gone");
    }
}
