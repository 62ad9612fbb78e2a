use sqlx::SqlitePool;

/// Hard retention for the whole cache collection, independent of entry TTLs.
pub const RETENTION_SECS: i64 = 24 * 60 * 60;

/// Cache row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRow {
    pub key: String,
    pub payload: String,
    pub cached_at: i64,
    pub ttl: i64,
}

impl CacheRow {
    /// Entry-level TTL check. Stale rows stay in the table until the
    /// retention purge removes them.
    pub fn is_fresh(&self, now: i64) -> bool {
        now - self.cached_at < self.ttl
    }
}

/// Get a cache row by key regardless of freshness.
pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<CacheRow>, sqlx::Error> {
    let row: Option<(String, String, i64, i64)> = sqlx::query_as(
        "SELECT key, payload, cached_at, ttl FROM metadata_cache WHERE key = ?",
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(key, payload, cached_at, ttl)| CacheRow {
        key,
        payload,
        cached_at,
        ttl,
    }))
}

/// Insert or overwrite a cache row.
pub async fn upsert(
    pool: &SqlitePool,
    key: &str,
    payload: &str,
    cached_at: i64,
    ttl: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO metadata_cache (key, payload, cached_at, ttl) VALUES (?, ?, ?, ?) \
         ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, \
         cached_at = excluded.cached_at, ttl = excluded.ttl",
    )
    .bind(key)
    .bind(payload)
    .bind(cached_at)
    .bind(ttl)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete every row cached before `cutoff`. Returns the number of rows removed.
pub async fn purge_older_than(pool: &SqlitePool, cutoff: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM metadata_cache WHERE cached_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Apply the collection-wide retention relative to `now`.
pub async fn enforce_retention(pool: &SqlitePool, now: i64) -> Result<u64, sqlx::Error> {
    purge_older_than(pool, now - RETENTION_SECS).await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metadata_cache")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
