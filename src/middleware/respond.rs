//! Pipeline-boundary error responder.
//!
//! The outermost layer of the chain. Any `ApiError` raised below it (handler,
//! auth layer, or another pipeline stage) rides the response extensions to
//! this point and is rendered here as the uniform JSON error body carrying
//! the request path, method and a UTC timestamp. Failures that never became
//! an `ApiError` (router 404s, extractor rejections) are shaped the same way
//! so no raw internal failure reaches a client. Every rendered error is
//! logged with the request context before it leaves, and the correlation and
//! hardening headers are backstopped for exits that short-circuited the
//! inner stages.

use axum::{
    body::Body,
    extract::Request,
    http::{header, header::HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::auth::PrincipalId;
use crate::error::ApiError;
use crate::middleware::redact::redact;
use crate::middleware::request_id::{incoming_id, REQUEST_ID_HEADER};
use crate::middleware::security_headers;

pub async fn respond(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();
    let client_addr = super::client_addr(&request).map(|a| a.to_string());
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let fallback_id = incoming_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut response = next.run(request).await;

    if !response.headers().contains_key(REQUEST_ID_HEADER) {
        if let Ok(value) = HeaderValue::from_str(&fallback_id) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
    }

    let status = response.status();
    let error = response.extensions().get::<ApiError>().cloned();
    if error.is_none() && !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let principal_id = response.extensions().get::<PrincipalId>().map(|p| p.0);
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(fallback_id.as_str())
        .to_string();
    let mut headers = response.headers().clone();

    let (code, detail, challenge) = match &error {
        Some(error) => (
            error.error_code().to_string(),
            error.message().to_string(),
            error.challenge(),
        ),
        // A failure that never went through the taxonomy: keep its status,
        // synthesize the code, and salvage the body text as the detail.
        None => {
            let detail = plain_detail(response).await.unwrap_or_else(|| {
                status.canonical_reason().unwrap_or("Request failed").to_string()
            });
            (code_for_status(status).to_string(), detail, None)
        }
    };

    let body = json!({
        "detail": detail,
        "code": code,
        "path": path,
        "method": method,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    });

    // The logged copy goes through redaction like every logged payload; the
    // wire body is the client's error and leaves as built.
    let mut logged = body.clone();
    redact(&mut logged);
    log_error(
        status,
        &logged,
        &code,
        &detail,
        &method,
        &path,
        &request_id,
        client_addr.as_deref(),
        user_agent.as_deref(),
        principal_id,
    );

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.remove(header::CONTENT_LENGTH);
    if let Some(challenge) = challenge {
        headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
    }

    let mut shaped = Response::new(Body::from(body.to_string()));
    *shaped.status_mut() = status;
    *shaped.headers_mut() = headers;
    security_headers::stamp(&mut shaped);
    shaped
}

/// Best-effort text salvage from a response that bypassed the taxonomy.
async fn plain_detail(response: Response) -> Option<String> {
    let bytes = axum::body::to_bytes(response.into_body(), 4096).await.ok()?;
    let text = std::str::from_utf8(&bytes).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

fn code_for_status(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "BAD_REQUEST",
        401 => "UNAUTHORIZED",
        403 => "FORBIDDEN",
        404 => "NOT_FOUND",
        405 => "METHOD_NOT_ALLOWED",
        409 => "CONFLICT",
        413 => "PAYLOAD_TOO_LARGE",
        415 => "UNSUPPORTED_MEDIA_TYPE",
        422 => "VALIDATION_ERROR",
        429 => "RATE_LIMITED",
        s if s >= 500 => "INTERNAL_ERROR",
        _ => "REQUEST_FAILED",
    }
}

/// Loud for server bugs, quiet for expected client mistakes.
#[allow(clippy::too_many_arguments)]
fn log_error(
    status: StatusCode,
    response_body: &serde_json::Value,
    code: &str,
    detail: &str,
    method: &str,
    path: &str,
    request_id: &str,
    ip: Option<&str>,
    user_agent: Option<&str>,
    user_id: Option<i64>,
) {
    let status = status.as_u16();
    if status >= 500 {
        tracing::error!(
            request_id, method, path, status, ip, user_agent, user_id, code, detail,
            response_body = %response_body, "server error"
        );
    } else if status == 400 {
        tracing::error!(
            request_id, method, path, status, ip, user_agent, user_id, code, detail,
            response_body = %response_body, "bad request"
        );
    } else if matches!(status, 401 | 403 | 422 | 429) {
        tracing::warn!(
            request_id, method, path, status, ip, user_agent, user_id, code, detail,
            response_body = %response_body, "client error"
        );
    } else {
        tracing::info!(
            request_id, method, path, status, ip, user_agent, user_id, code, detail,
            response_body = %response_body, "client error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/missing",
                get(|| async { ApiError::user_not_found("User not found") }),
            )
            .route(
                "/denied",
                get(|| async { ApiError::invalid_credentials("Invalid or expired token") }),
            )
            .layer(axum::middleware::from_fn(respond))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn error_body_carries_the_full_shape() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/missing")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["detail"], "User not found");
        assert_eq!(body["code"], "USER_NOT_FOUND");
        assert_eq!(body["path"], "/missing");
        assert_eq!(body["method"], "GET");
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'), "not UTC: {}", timestamp);
    }

    #[tokio::test]
    async fn unauthorized_keeps_its_challenge_header() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/denied")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn error_exits_still_carry_request_id_and_hardening_headers() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/missing")
            .header(REQUEST_ID_HEADER, "err-trace-7")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "err-trace-7");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    #[tokio::test]
    async fn failures_outside_the_taxonomy_are_shaped_too() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/no-such-route")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["path"], "/no-such-route");
        assert!(body["detail"].is_string());
        assert!(body["timestamp"].is_string());
    }
}
