//! Body-size admission control (pipeline stage 1).
//!
//! Rejects oversized bodies on state-changing methods before the handler
//! runs. A declared `Content-Length` over the ceiling is refused outright;
//! bodies without one are streamed and counted, aborting the moment the
//! ceiling is crossed so nothing is buffered unboundedly. The accepted body
//! is re-injected unchanged for downstream stages and the handler.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use futures::StreamExt;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn enforce(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let max_size = state.config.api.max_request_size_bytes;

    let method = request.method();
    if method != Method::POST && method != Method::PUT && method != Method::PATCH {
        return Ok(next.run(request).await);
    }

    if let Some(declared) = declared_length(&request) {
        if declared > max_size {
            return Err(too_large(max_size));
        }
    }

    // No trustworthy length declared (or a lying one): stream and count.
    let (parts, body) = request.into_parts();
    let mut stream = body.into_data_stream();
    let mut collected: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::warn!("failed to read request body: {}", e);
            ApiError::bad_request("Malformed request body")
        })?;
        if collected.len() + chunk.len() > max_size {
            return Err(too_large(max_size));
        }
        collected.extend_from_slice(&chunk);
    }

    let request = Request::from_parts(parts, Body::from(collected));
    Ok(next.run(request).await)
}

fn declared_length(request: &Request) -> Option<usize> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn too_large(max_size: usize) -> ApiError {
    ApiError::payload_too_large(format!("Request body too large. Max size: {} bytes", max_size))
}
