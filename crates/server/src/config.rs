use std::path::PathBuf;

use marquee_metadata::cache::DEFAULT_TTL_SECS;
use marquee_metadata::imdb::ImdbConfig;
use marquee_metadata::tmdb::TmdbConfig;
use thiserror::Error;

pub const DEFAULT_DB_PATH: &str = "marquee.db";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Startup configuration, read once and never changed.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub bind_addr: String,
    pub admin_user_id: i64,
    /// `None` when no TMDB key is set; lookups then only scrape.
    pub tmdb: Option<TmdbConfig>,
    pub imdb: ImdbConfig,
    pub rate_limit_per_minute: u64,
    pub font_path: Option<PathBuf>,
    pub bold_font_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let admin_user_id = parse_required(&get, "MARQUEE_ADMIN_USER_ID")?;
        let cache_ttl_secs: i64 =
            parse_optional(&get, "MARQUEE_CACHE_TTL_SECS")?.unwrap_or(DEFAULT_TTL_SECS);
        if cache_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: "MARQUEE_CACHE_TTL_SECS",
                value: cache_ttl_secs.to_string(),
            });
        }

        let tmdb = get("TMDB_API_KEY").map(|key| {
            let mut tmdb = TmdbConfig::new(key);
            if let Some(url) = get("MARQUEE_TMDB_BASE_URL") {
                tmdb.base_url = url;
            }
            if let Some(url) = get("MARQUEE_TMDB_IMAGE_BASE_URL") {
                tmdb.image_base_url = url;
            }
            tmdb.cache_ttl_secs = cache_ttl_secs;
            tmdb
        });

        let mut imdb = ImdbConfig {
            cache_ttl_secs,
            ..Default::default()
        };
        if let Some(url) = get("MARQUEE_IMDB_BASE_URL") {
            imdb.base_url = url;
        }

        Ok(Self {
            db_path: get("MARQUEE_DB").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            bind_addr: get("MARQUEE_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            admin_user_id,
            tmdb,
            imdb,
            rate_limit_per_minute: parse_optional(&get, "MARQUEE_RATE_LIMIT_PER_MINUTE")?
                .unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE),
            font_path: get("MARQUEE_FONT_PATH").map(PathBuf::from),
            bold_font_path: get("MARQUEE_BOLD_FONT_PATH").map(PathBuf::from),
        })
    }
}

fn parse_optional<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match get(name) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn parse_required<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<T, ConfigError> {
    parse_optional(get, name)?.ok_or(ConfigError::Missing(name))
}
