use std::time::Duration;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::require_auth;
use crate::config::{AppConfig, API_PREFIX};
use crate::handlers;
use crate::middleware::{body_limit, logging, rate_limit, request_id, respond, security_headers};
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(auth_routes())
        .merge(user_routes(state.clone()))
        .merge(item_routes(state.clone()))
        // Pipeline stages. Each layer wraps everything added before it, so
        // the chain reads innermost (1) to outermost (6), with the error
        // responder as the recovery boundary around the whole pipeline.
        .layer(from_fn_with_state(state.clone(), body_limit::enforce)) // 1. body-size admission
        .layer(from_fn(security_headers::apply)) // 2. security headers
        .layer(from_fn(logging::log_requests)) // 3. structured logging
        .layer(from_fn(request_id::propagate)) // 4. request-id propagation
        .layer(from_fn_with_state(state.clone(), rate_limit::enforce)) // 5. rate limiting
        .layer(cors) // 6. cross-origin policy
        .layer(from_fn(respond::respond)) // error recovery boundary
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use axum::routing::post;
    use crate::handlers::auth;

    Router::new()
        .route(&format!("{}/auth/register", API_PREFIX), post(auth::register))
        .route(&format!("{}/auth/token", API_PREFIX), post(auth::login))
}

fn user_routes(state: AppState) -> Router<AppState> {
    use crate::handlers::users;

    Router::new()
        .route(&format!("{}/users/me", API_PREFIX), get(users::me))
        .route_layer(from_fn_with_state(state, require_auth))
}

fn item_routes(state: AppState) -> Router<AppState> {
    use crate::handlers::items;

    Router::new()
        .route(
            &format!("{}/items", API_PREFIX),
            get(items::list).post(items::create),
        )
        .route(
            &format!("{}/items/:id", API_PREFIX),
            get(items::get).put(items::update).delete(items::delete),
        )
        .route_layer(from_fn_with_state(state, require_auth))
}

/// Cross-origin policy from the configured allow-list. Without configured
/// origins the API stays same-origin only; credentials are only allowed for
/// an explicit origin list.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let mut layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .max_age(Duration::from_secs(600));

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if !origins.is_empty() {
        layer = layer.allow_origin(origins).allow_credentials(true);
    }
    layer
}
