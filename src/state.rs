use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::TokenService;
use crate::config::AppConfig;
use crate::middleware::rate_limit::RateLimiter;

/// Everything the request path needs, built once in `main` and cloned into
/// handlers and middleware. The limiter is the only member holding mutable
/// cross-request state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenService>,
    pub pool: SqlitePool,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: AppConfig, tokens: TokenService, pool: SqlitePool) -> Self {
        let limiter = RateLimiter::new(
            config.api.rate_limit_requests,
            std::time::Duration::from_secs(config.api.rate_limit_window_secs),
        );
        Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            pool,
            limiter: Arc::new(limiter),
        }
    }
}
