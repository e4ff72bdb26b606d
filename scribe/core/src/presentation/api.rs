// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::middleware;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use super::errors::ApiError;
use super::middleware::{request_context, resolve_tenant, RequestContext};
use crate::application::message_bus::CommandOutput;
use crate::application::service_factory::ScribeServices;
use crate::application::views::{self, DocumentView, SummaryView};
use crate::domain::commands::{
    Command, CreateDocument, DeleteSummary, SaveSummary, SoftDeleteDocument, UpdateDocument, UpdateSummary,
};
use crate::domain::document::DocumentId;
use crate::domain::llm::SummaryOptions;
use crate::domain::tenant::TenantId;
use crate::infrastructure::event_bus::{EventBusError, EventReceiver};

pub struct AppState {
    pub services: ScribeServices,
}

pub fn app(services: ScribeServices) -> Router {
    let state = Arc::new(AppState { services });

    let documents = Router::new()
        .route("/api/documents", get(list_documents).post(create_document))
        .route("/api/documents/events", get(tenant_events))
        .route(
            "/api/documents/{id}",
            get(get_document).put(update_document).delete(soft_delete_document),
        )
        .route(
            "/api/documents/{id}/summary",
            get(get_summary).post(save_summary).put(update_summary).delete(delete_summary),
        )
        .route("/api/documents/{id}/summary/stream", post(stream_summary))
        .route("/api/documents/{id}/events", get(document_events))
        .route_layer(middleware::from_fn(resolve_tenant));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(documents)
        .layer(middleware::from_fn(request_context))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
pub struct DocumentRequest {
    pub title: String,
    pub content_html: String,
}

#[derive(Deserialize)]
pub struct SummaryRequest {
    pub content_html: String,
}

/// Unparseable ids are unknown resources
fn document_id(raw: &str) -> Result<DocumentId, ApiError> {
    DocumentId::from_string(raw).map_err(|_| ApiError::not_found(format!("Document {} not found", raw)))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn dispatch(state: &AppState, tenant: TenantId, command: Command) -> Result<CommandOutput, ApiError> {
    let mut bus = state.services.message_bus(tenant);
    let kind = command.kind();
    bus.handle(command).await?;
    bus.results()
        .iter()
        .rev()
        .find(|output| output.kind == kind)
        .cloned()
        .ok_or_else(|| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "InternalError", "Command produced no result"))
}

async fn create_document(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
    payload: Result<Json<DocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DocumentView>), ApiError> {
    let Json(payload) = payload?;
    let command = CreateDocument::new(payload.title, payload.content_html)?;
    let output = dispatch(&state, tenant.clone(), command.into()).await?;

    let mut uow = state.services.unit_of_work(tenant);
    let document = views::document(uow.as_mut(), output.document_id).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut uow = state.services.unit_of_work(tenant);
    let items = views::documents(uow.as_mut()).await?;
    Ok(Json(json!({ "items": items })))
}

async fn get_document(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
) -> Result<Json<DocumentView>, ApiError> {
    let id = document_id(&id)?;
    let mut uow = state.services.unit_of_work(tenant);
    Ok(Json(views::document(uow.as_mut(), id).await?))
}

async fn update_document(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
    payload: Result<Json<DocumentRequest>, JsonRejection>,
) -> Result<Json<DocumentView>, ApiError> {
    let id = document_id(&id)?;
    let Json(payload) = payload?;
    let command = UpdateDocument::new(id, payload.title, payload.content_html)?;
    dispatch(&state, tenant.clone(), command.into()).await?;

    let mut uow = state.services.unit_of_work(tenant);
    Ok(Json(views::document(uow.as_mut(), id).await?))
}

async fn soft_delete_document(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = document_id(&id)?;
    dispatch(&state, tenant, SoftDeleteDocument { id }.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_summary(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
) -> Result<Json<SummaryView>, ApiError> {
    let id = document_id(&id)?;
    let mut uow = state.services.unit_of_work(tenant);
    Ok(Json(views::summary(uow.as_mut(), id).await?))
}

async fn save_summary(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CommandOutput>), ApiError> {
    let id = document_id(&id)?;
    let Json(payload) = payload?;
    let output = dispatch(&state, tenant, SaveSummary::new(id, payload.content_html)?.into()).await?;
    Ok((StatusCode::CREATED, Json(output)))
}

async fn update_summary(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Json<CommandOutput>, ApiError> {
    let id = document_id(&id)?;
    let Json(payload) = payload?;
    let output = dispatch(&state, tenant, UpdateSummary::new(id, payload.content_html)?.into()).await?;
    Ok(Json(output))
}

async fn delete_summary(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = document_id(&id)?;
    dispatch(&state, tenant, DeleteSummary { document_id: id }.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lenient options body: anything unparseable falls back to defaults
#[derive(Debug, Default, Deserialize)]
struct StreamRequest {
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default)]
    timeout_s: Option<serde_json::Value>,
    #[serde(default)]
    mock_text: Option<String>,
}

fn parse_timeout(value: &serde_json::Value) -> Option<Duration> {
    let seconds = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs(seconds.trunc() as u64))
}

fn summary_options(body: &[u8]) -> SummaryOptions {
    let request: StreamRequest = serde_json::from_slice(body).unwrap_or_default();
    SummaryOptions {
        instruction: request.instruction,
        timeout: request.timeout_s.as_ref().and_then(parse_timeout),
        mock_text: request.mock_text,
    }
}

async fn stream_summary(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let id = document_id(&id)?;
    let options = summary_options(&body);

    let frames = state
        .services
        .summaries
        .stream(tenant, id, Some(context.request_id), options, CancellationToken::new())
        .map(|frame| {
            Ok::<_, Infallible>(
                Event::default()
                    .event(frame.event_name())
                    .data(frame.data().to_string()),
            )
        });

    let headers = [(HeaderName::from_static("x-accel-buffering"), HeaderValue::from_static("no"))];
    Ok((headers, Sse::new(frames).keep_alive(KeepAlive::default())))
}

/// Committed events as SSE, named after the event. A lagging observer skips
/// what it missed; the feed ends when the bus closes.
fn event_feed(mut receiver: EventReceiver) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(event) => yield Ok(Event::default().event(event.name()).data(event.body().to_string())),
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }
}

async fn tenant_events(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
) -> impl IntoResponse {
    let receiver = state.services.event_bus.subscribe_tenant(tenant);
    Sse::new(event_feed(receiver)).keep_alive(KeepAlive::default())
}

async fn document_events(
    State(state): State<Arc<AppState>>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = document_id(&id)?;
    // Only documents visible to the tenant can be observed
    let mut uow = state.services.unit_of_work(tenant);
    views::document(uow.as_mut(), id).await?;

    let receiver = state.services.event_bus.subscribe_document(id);
    Ok(Sse::new(event_feed(receiver)).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_options_are_lenient() {
        let options = summary_options(br#"{"timeout_s": "30", "instruction": "Short."}"#);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.instruction.as_deref(), Some("Short."));

        assert_eq!(summary_options(b"").timeout, None);
        assert_eq!(summary_options(b"not json").instruction, None);
        assert_eq!(summary_options(br#"{"timeout_s": "soon"}"#).timeout, None);
        assert_eq!(summary_options(br#"{"timeout_s": 0}"#).timeout, Some(Duration::ZERO));
    }
}
