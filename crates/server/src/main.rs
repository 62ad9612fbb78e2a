use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use marquee_metadata::cache::MetadataCache;
use marquee_metadata::imdb::ImdbScraper;
use marquee_metadata::provider::{ScrapedSource, StructuredSource};
use marquee_metadata::resolver::Resolver;
use marquee_metadata::tmdb::TmdbClient;
use marquee_render::{FontSet, PosterRenderer};
use marquee_server::config::Config;
use marquee_server::rate_limit::RateLimiter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const RETENTION_SWEEP: Duration = Duration::from_secs(600);
const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    info!(db_path = %config.db_path, "connecting to database");
    let pool = marquee_db::connect(&config.db_path)
        .await
        .context("failed to connect to database")?;

    marquee_db::migrate::run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("migrations complete");

    // Cached rows past the retention horizon are swept in the background.
    {
        let pool = pool.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(RETENTION_SWEEP);
            loop {
                ticker.tick().await;
                let now = chrono::Utc::now().timestamp();
                match marquee_db::repo::cache::enforce_retention(&pool, now).await {
                    Ok(0) => {}
                    Ok(purged) => info!(purged, "purged stale cache entries"),
                    Err(e) => warn!(error = %e, "cache retention sweep failed"),
                }
            }
        });
    }

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build http client")?;
    let cache = MetadataCache::new(pool.clone());

    let structured: Option<Arc<dyn StructuredSource>> = match config.tmdb.clone() {
        Some(tmdb) => Some(Arc::new(TmdbClient::new(tmdb, http.clone(), cache.clone()))),
        None => {
            warn!("TMDB_API_KEY not set, lookups will use IMDb only");
            None
        }
    };
    let scraped: Arc<dyn ScrapedSource> =
        Arc::new(ImdbScraper::new(config.imdb.clone(), http.clone(), cache));
    let resolver = Arc::new(Resolver::new(structured, scraped));

    let renderer = match FontSet::discover(
        config.font_path.as_deref(),
        config.bold_font_path.as_deref(),
    ) {
        Some(fonts) => Some(Arc::new(PosterRenderer::new(http, fonts))),
        None => {
            warn!("no caption font found, posters disabled");
            None
        }
    };

    let app_state = marquee_server::state::AppState {
        db: pool,
        resolver,
        renderer,
        admin_user_id: config.admin_user_id,
        rate_limiter: RateLimiter::per_minute(config.rate_limit_per_minute),
    };

    let app = marquee_server::routes::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %config.bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
