//! Structured request logging (pipeline stage 3).
//!
//! Logs every successful response with the fixed context record: method,
//! path, status, client address, user-agent, resolved principal id, and a
//! best-effort decode of the response body with sensitive fields redacted.
//! Failures are logged by the pipeline-boundary responder instead, with the
//! same record.

use axum::{
    body::Body,
    extract::Request,
    middleware::Next,
    response::Response,
};

use crate::auth::PrincipalId;
use crate::middleware::redact::redacted_json;
use crate::middleware::RequestContext;

pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let context = request.extensions().get::<RequestContext>().cloned();

    let response = next.run(request).await;
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        // The boundary responder owns error logging
        return response;
    }

    let principal_id = response.extensions().get::<PrincipalId>().map(|p| p.0);
    let (parts, body) = response.into_parts();
    let (body, decoded) = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let decoded = redacted_json(&bytes);
            (Body::from(bytes), decoded)
        }
        Err(e) => {
            tracing::warn!("failed to read response body for logging: {}", e);
            (Body::empty(), None)
        }
    };

    let (request_id, client_addr, user_agent) = match &context {
        Some(ctx) => (
            ctx.request_id.as_str(),
            ctx.client_addr.map(|a| a.to_string()),
            ctx.user_agent.as_deref(),
        ),
        None => ("", None, None),
    };

    tracing::info!(
        request_id,
        method = %method,
        path = %path,
        status = status.as_u16(),
        ip = client_addr.as_deref(),
        user_agent,
        user_id = principal_id,
        response_body = decoded.as_ref().map(tracing::field::display),
        "request succeeded"
    );

    Response::from_parts(parts, body)
}
