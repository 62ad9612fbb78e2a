use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use marquee_core::error::{ErrorBody, ErrorEnvelope};
use tokio::sync::Mutex;
use tracing::debug;

use crate::auth::USER_ID_HEADER;
use crate::state::AppState;

/// Sliding-window limiter keyed by caller.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u64, window_secs: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn per_minute(max_requests: u64) -> Self {
        Self::new(max_requests, 60)
    }

    /// Record a call for `key`. Returns the remaining allowance, or the
    /// seconds until the oldest call leaves the window.
    pub async fn check(&self, key: &str) -> Result<u64, u64> {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Result<u64, u64> {
        let mut buckets = self.inner.lock().await;
        buckets.retain(|_, entries| {
            entries.retain(|t| now.saturating_duration_since(*t) < self.window);
            !entries.is_empty()
        });
        let entries = buckets.entry(key.to_string()).or_default();

        if entries.len() as u64 >= self.max_requests {
            let oldest = entries.iter().min().copied().unwrap_or(now);
            let wait = self.window.saturating_sub(now.saturating_duration_since(oldest));
            // Round up so a client never retries a moment too early.
            let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            return Err(secs.max(1));
        }

        entries.push(now);
        Ok(self.max_requests - entries.len() as u64)
    }
}

/// Limits lookups by the admin. Any other caller passes through untracked
/// and is rejected by the admin gate.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let user = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());
    let Some(user) = user.filter(|id| *id == state.admin_user_id) else {
        return next.run(request).await;
    };

    match state.rate_limiter.check(&format!("user:{user}")).await {
        Ok(_remaining) => next.run(request).await,
        Err(retry_after) => {
            debug!(user, retry_after, "rate limit exceeded");
            let envelope = ErrorEnvelope {
                error: ErrorBody {
                    code: "too_many_requests".to_string(),
                    message: "too many requests".to_string(),
                    details: serde_json::json!({ "retry_after_seconds": retry_after }),
                },
            };
            (StatusCode::TOO_MANY_REQUESTS, Json(envelope)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_limit() {
        let limiter = RateLimiter::new(3, 60);
        let now = Instant::now();
        assert_eq!(limiter.check_at("user:1", now).await, Ok(2));
        assert_eq!(limiter.check_at("user:1", now).await, Ok(1));
        assert_eq!(limiter.check_at("user:1", now).await, Ok(0));
        assert!(limiter.check_at("user:1", now).await.is_err());
        // Other callers have their own window.
        assert_eq!(limiter.check_at("user:2", now).await, Ok(2));
    }

    #[tokio::test]
    async fn retry_after_tracks_oldest_call() {
        let limiter = RateLimiter::new(2, 60);
        let start = Instant::now();
        limiter.check_at("k", start).await.unwrap();
        limiter.check_at("k", start + Duration::from_secs(20)).await.unwrap();

        let err = limiter.check_at("k", start + Duration::from_secs(30)).await;
        assert_eq!(err, Err(30));
    }

    #[tokio::test]
    async fn idle_buckets_are_dropped() {
        let limiter = RateLimiter::new(1, 60);
        let start = Instant::now();
        for i in 0..1000 {
            limiter.check_at(&format!("user:{i}"), start).await.unwrap();
        }
        assert_eq!(limiter.inner.lock().await.len(), 1000);

        let later = start + Duration::from_secs(3600);
        limiter.check_at("user:0", later).await.unwrap();
        assert_eq!(limiter.inner.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn window_slides() {
        let limiter = RateLimiter::new(1, 60);
        let start = Instant::now();
        limiter.check_at("k", start).await.unwrap();
        assert!(limiter.check_at("k", start + Duration::from_secs(59)).await.is_err());
        assert_eq!(limiter.check_at("k", start + Duration::from_secs(60)).await, Ok(0));
    }
}
