//! Hardening headers (pipeline stage 2), stamped on every response
//! regardless of status code.

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("cross-origin-opener-policy", "same-origin"),
    // HSTS stays off; it breaks plain-HTTP development setups.
];

pub async fn apply(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    stamp(&mut response);
    response
}

/// Idempotent header stamping, shared with the pipeline-boundary responder
/// for exits that never reach this stage.
pub fn stamp(response: &mut Response) {
    let headers = response.headers_mut();
    for (name, value) in HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn headers_are_present_on_success_and_failure() {
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route(
                "/boom",
                get(|| async { crate::error::ApiError::internal("boom") }),
            )
            .layer(axum::middleware::from_fn(apply));

        for path in ["/ok", "/boom"] {
            let request = Request::builder()
                .method(Method::GET)
                .uri(path)
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            if path == "/boom" {
                assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            }
            let headers = response.headers();
            assert_eq!(headers["x-content-type-options"], "nosniff");
            assert_eq!(headers["x-frame-options"], "DENY");
            assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");
            assert_eq!(headers["cross-origin-opener-policy"], "same-origin");
        }
    }
}
