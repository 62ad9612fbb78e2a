//! TTL-checked metadata cache on top of the `metadata_cache` table.
//!
//! Payloads are stored as JSON. The cache never fails a lookup: storage or
//! decoding errors are logged and reported as a miss.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use marquee_db::repo::cache as cache_repo;

/// Default per-entry TTL in seconds.
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Clone)]
pub struct MetadataCache {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl MetadataCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    pub fn with_clock(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Fresh payload for `key`, if any. Stale rows are left in place.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let row = match cache_repo::get(&self.pool, key).await {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed");
                return None;
            }
        };

        if !row.is_fresh(self.clock.now()) {
            debug!(key, "cache entry expired");
            return None;
        }

        match serde_json::from_str(&row.payload) {
            Ok(value) => {
                debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "cached payload could not be decoded");
                None
            }
        }
    }

    /// Upsert `value` under `key`, stamping the current time.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: i64) {
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                warn!(key, error = %e, "cache payload could not be encoded");
                return;
            }
        };

        if let Err(e) =
            cache_repo::upsert(&self.pool, key, &payload, self.clock.now(), ttl).await
        {
            warn!(key, error = %e, "cache write failed");
        }
    }
}

/// Lowercased, whitespace-collapsed title used inside cache keys.
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `{prefix}_{title}_{year|no_year}`
pub fn search_key(prefix: &str, title: &str, year: Option<i32>) -> String {
    let year = year.map_or_else(|| "no_year".to_string(), |y| y.to_string());
    format!("{prefix}_{}_{year}", normalize_title(title))
}
