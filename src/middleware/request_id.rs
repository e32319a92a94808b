//! Correlation-id propagation (pipeline stage 4).
//!
//! Accepts a client-supplied `X-Request-ID` or generates a fresh one, builds
//! the per-request context record consumed by the logging stage, and echoes
//! the id on the response.

use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request record threaded through the pipeline. Created here, read by
/// the logging stage, discarded once the response is logged.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub client_addr: Option<std::net::SocketAddr>,
    pub user_agent: Option<String>,
}

pub async fn propagate(mut request: Request, next: Next) -> Response {
    let request_id = incoming_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    let context = RequestContext {
        request_id: request_id.clone(),
        client_addr: super::client_addr(&request),
        user_agent: request
            .headers()
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    };
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

pub(crate) fn incoming_id(request: &Request) -> Option<String> {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Extension;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/ctx",
                get(|Extension(ctx): Extension<RequestContext>| async move { ctx.request_id }),
            )
            .layer(axum::middleware::from_fn(propagate))
    }

    #[tokio::test]
    async fn client_supplied_id_is_kept_and_echoed() {
        let request = Request::builder()
            .uri("/ctx")
            .header(REQUEST_ID_HEADER, "trace-me-42")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-me-42");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"trace-me-42");
    }

    #[tokio::test]
    async fn missing_id_gets_a_generated_uuid() {
        let request = Request::builder().uri("/ctx").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();

        let echoed = response.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
        assert!(Uuid::parse_str(&echoed).is_ok());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], echoed.as_bytes());
    }
}
