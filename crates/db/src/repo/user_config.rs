use marquee_core::types::{DEFAULT_CAPTION, DEFAULT_LANDSCAPE_CAPTION};
use sqlx::SqlitePool;

/// Per-user caption configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserConfigRow {
    pub user_id: i64,
    pub caption_template: String,
    pub landscape_mode: bool,
    pub landscape_caption: String,
    pub created_ts: i64,
    pub updated_ts: i64,
}

/// Find a user's configuration.
pub async fn get(pool: &SqlitePool, user_id: i64) -> Result<Option<UserConfigRow>, sqlx::Error> {
    let row: Option<(i64, String, bool, String, i64, i64)> = sqlx::query_as(
        "SELECT user_id, caption_template, landscape_mode, landscape_caption, created_ts, updated_ts \
         FROM user_config WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(user_id, caption_template, landscape_mode, landscape_caption, created_ts, updated_ts)| {
            UserConfigRow {
                user_id,
                caption_template,
                landscape_mode,
                landscape_caption,
                created_ts,
                updated_ts,
            }
        },
    ))
}

/// Insert the default configuration for a user unless one exists.
async fn ensure_defaults(pool: &SqlitePool, user_id: i64) -> Result<(), sqlx::Error> {
    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT OR IGNORE INTO user_config \
         (user_id, caption_template, landscape_mode, landscape_caption, created_ts, updated_ts) \
         VALUES (?, ?, 0, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(DEFAULT_CAPTION)
    .bind(DEFAULT_LANDSCAPE_CAPTION)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Get a user's configuration, creating the default record on first access.
pub async fn get_or_create(pool: &SqlitePool, user_id: i64) -> Result<UserConfigRow, sqlx::Error> {
    ensure_defaults(pool, user_id).await?;
    get(pool, user_id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Replace the portrait caption template.
pub async fn set_caption_template(
    pool: &SqlitePool,
    user_id: i64,
    template: &str,
) -> Result<(), sqlx::Error> {
    ensure_defaults(pool, user_id).await?;
    sqlx::query("UPDATE user_config SET caption_template = ?, updated_ts = ? WHERE user_id = ?")
        .bind(template)
        .bind(chrono::Utc::now().timestamp())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace the landscape caption template.
pub async fn set_landscape_caption(
    pool: &SqlitePool,
    user_id: i64,
    template: &str,
) -> Result<(), sqlx::Error> {
    ensure_defaults(pool, user_id).await?;
    sqlx::query("UPDATE user_config SET landscape_caption = ?, updated_ts = ? WHERE user_id = ?")
        .bind(template)
        .bind(chrono::Utc::now().timestamp())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Toggle landscape mode.
pub async fn set_landscape_mode(
    pool: &SqlitePool,
    user_id: i64,
    enabled: bool,
) -> Result<(), sqlx::Error> {
    ensure_defaults(pool, user_id).await?;
    sqlx::query("UPDATE user_config SET landscape_mode = ?, updated_ts = ? WHERE user_id = ?")
        .bind(enabled)
        .bind(chrono::Utc::now().timestamp())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_config")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pool() -> SqlitePool {
        let pool = crate::connect(":memory:").await.unwrap();
        crate::migrate::run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn first_access_creates_defaults() {
        let pool = pool().await;
        assert!(get(&pool, 7).await.unwrap().is_none());

        let cfg = get_or_create(&pool, 7).await.unwrap();
        assert_eq!(cfg.caption_template, DEFAULT_CAPTION);
        assert_eq!(cfg.landscape_caption, DEFAULT_LANDSCAPE_CAPTION);
        assert!(!cfg.landscape_mode);
        assert_eq!(count(&pool).await.unwrap(), 1);

        get_or_create(&pool, 7).await.unwrap();
        assert_eq!(count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn setters_upsert_single_fields() {
        let pool = pool().await;
        set_landscape_mode(&pool, 9, true).await.unwrap();
        set_caption_template(&pool, 9, "{title}").await.unwrap();

        let cfg = get(&pool, 9).await.unwrap().unwrap();
        assert!(cfg.landscape_mode);
        assert_eq!(cfg.caption_template, "{title}");
        assert_eq!(cfg.landscape_caption, DEFAULT_LANDSCAPE_CAPTION);

        set_landscape_caption(&pool, 9, "{title} | {year}").await.unwrap();
        set_landscape_mode(&pool, 9, false).await.unwrap();
        let cfg = get(&pool, 9).await.unwrap().unwrap();
        assert!(!cfg.landscape_mode);
        assert_eq!(cfg.landscape_caption, "{title} | {year}");
        assert_eq!(cfg.caption_template, "{title}");
    }
}
