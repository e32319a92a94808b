pub mod body_limit;
pub mod logging;
pub mod rate_limit;
pub mod redact;
pub mod request_id;
pub mod respond;
pub mod security_headers;

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

pub use request_id::RequestContext;

/// Client address as seen by the listener, when the server was started with
/// connect-info (absent under in-process test harnesses).
pub(crate) fn client_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}
