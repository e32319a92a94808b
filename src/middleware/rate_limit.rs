//! Per-client rate limiting (pipeline stage 5).
//!
//! A rolling-window counter keyed by client address, enforced on the
//! credential endpoints before the handler runs. The counter map is the only
//! mutable state shared across concurrent requests; all reads and increments
//! for a key happen under one lock so concurrent requests from the same
//! client cannot undercount.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record one hit for `key`, refusing it once the quota for the rolling
    /// window is spent.
    pub fn check(&self, key: &str) -> Result<(), ApiError> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), ApiError> {
        let mut hits = self.hits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let history = hits.entry(key.to_string()).or_default();

        // Drop hits that have aged out of the window
        while let Some(oldest) = history.front() {
            if now.duration_since(*oldest) >= self.window {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() as u32 >= self.max_requests {
            return Err(ApiError::rate_limited("Too many requests"));
        }
        history.push_back(now);
        Ok(())
    }
}

pub async fn enforce(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path();
    let limited = state
        .config
        .api
        .rate_limited_paths
        .iter()
        .any(|limited| path == limited);

    if limited {
        let key = super::client_addr(&request)
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        state.limiter.check(&key)?;
    }

    Ok(next.run(request).await)
}
