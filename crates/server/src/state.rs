use std::sync::Arc;

use marquee_metadata::resolver::Resolver;
use marquee_render::PosterRenderer;
use sqlx::SqlitePool;

use crate::rate_limit::RateLimiter;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub resolver: Arc<Resolver>,
    /// `None` when no caption font could be loaded; lookups are text-only.
    pub renderer: Option<Arc<PosterRenderer>>,
    pub admin_user_id: i64,
    pub rate_limiter: RateLimiter,
}
