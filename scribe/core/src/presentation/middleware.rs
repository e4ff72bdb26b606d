// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Request middleware: request ids, tenant resolution, error rendering

use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::errors::{ApiError, ErrorDetails};
use crate::domain::tenant::TenantId;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Per-request values visible to handlers
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Accept or generate the request id, echo it back, and render `ApiError`s
pub async fn request_context(mut req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let path = req.uri().path().to_string();

    req.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });
    let mut response = next.run(req).await;

    if let Some(details) = response.extensions_mut().remove::<ErrorDetails>() {
        let status = response.status();
        response = (
            status,
            Json(json!({
                "error": details.error,
                "description": details.description,
                "status_code": status.as_u16(),
                "request_id": request_id,
                "path": path,
            })),
        )
            .into_response();
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Tenant from `X-Tenant-Id`, else the `Host` header without its port
pub fn tenant_from_headers(headers: &HeaderMap) -> Option<TenantId> {
    let raw = header_value(headers, TENANT_HEADER).or_else(|| {
        header_value(headers, axum::http::header::HOST.as_str()).and_then(|host| host.split(':').next())
    })?;
    TenantId::new(raw).ok()
}

pub async fn resolve_tenant(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let Some(tenant) = tenant_from_headers(req.headers()) else {
        warn!(path = %req.uri().path(), "Missing tenant config");
        return Err(ApiError::missing_tenant());
    };
    info!(tenant = %tenant, method = %req.method(), path = %req.uri().path(), "Request");
    req.extensions_mut().insert(tenant);
    Ok(next.run(req).await)
}
