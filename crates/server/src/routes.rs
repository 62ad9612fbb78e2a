use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use base64::Engine;
use marquee_core::error::ApiError;
use marquee_core::{NormalizedMedia, Orientation};
use marquee_db::repo::{cache, user_config};
use marquee_metadata::resolver::SourceTag;
use marquee_render::caption::{TEMPLATE_VARIABLES, unescape_newlines};
use marquee_render::{TemplateValidation, validate_template};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::pipeline;
use crate::rate_limit::rate_limit;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router(&state))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_router(state: &AppState) -> Router<AppState> {
    let lookups = Router::new()
        .route("/lookup", post(lookup))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .merge(lookups)
        .route("/config", get(get_config))
        .route("/config/caption", put(set_caption))
        .route("/config/landscape", put(set_landscape))
        .route("/config/landscape-caption", put(set_landscape_caption))
        .route("/status", get(status))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("database check failed: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LookupRequest {
    query: String,
}

#[derive(Serialize)]
struct LookupResponse {
    source: SourceTag,
    orientation: Orientation,
    caption: String,
    media: NormalizedMedia,
    /// Base64 JPEG, `null` for a text-only reply.
    image: Option<String>,
}

async fn lookup(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, AppError> {
    let delivery = pipeline::deliver(&state, admin.user_id, &body.query).await?;

    Ok(Json(LookupResponse {
        source: delivery.source,
        orientation: delivery.orientation,
        caption: delivery.caption,
        media: delivery.media,
        image: delivery
            .image
            .map(|bytes| base64::engine::general_purpose::STANDARD.encode(bytes)),
    }))
}

// ---------------------------------------------------------------------------
// Per-user caption configuration
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ConfigResponse {
    user_id: i64,
    caption_template: String,
    landscape_mode: bool,
    landscape_caption: String,
    updated_ts: i64,
    variables: &'static [&'static str],
}

impl From<user_config::UserConfigRow> for ConfigResponse {
    fn from(row: user_config::UserConfigRow) -> Self {
        Self {
            user_id: row.user_id,
            caption_template: row.caption_template,
            landscape_mode: row.landscape_mode,
            landscape_caption: row.landscape_caption,
            updated_ts: row.updated_ts,
            variables: TEMPLATE_VARIABLES,
        }
    }
}

#[derive(Deserialize)]
struct TemplateBody {
    template: String,
}

#[derive(Deserialize)]
struct LandscapeBody {
    enabled: bool,
}

async fn get_config(
    State(state): State<AppState>,
    admin: AdminUser,
) -> Result<Json<ConfigResponse>, AppError> {
    let row = user_config::get_or_create(&state.db, admin.user_id).await?;
    Ok(Json(row.into()))
}

/// Unescape `\n` sequences, then validate.
fn checked_template(raw: &str) -> Result<String, AppError> {
    let template = unescape_newlines(raw);
    match validate_template(&template) {
        TemplateValidation::Valid => Ok(template),
        TemplateValidation::Invalid(reason) => Err(ApiError::BadRequest(reason).into()),
    }
}

async fn set_caption(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<TemplateBody>,
) -> Result<Json<ConfigResponse>, AppError> {
    let template = checked_template(&body.template)?;
    user_config::set_caption_template(&state.db, admin.user_id, &template).await?;
    info!(user_id = admin.user_id, "caption template updated");

    let row = user_config::get_or_create(&state.db, admin.user_id).await?;
    Ok(Json(row.into()))
}

async fn set_landscape_caption(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<TemplateBody>,
) -> Result<Json<ConfigResponse>, AppError> {
    let template = checked_template(&body.template)?;
    user_config::set_landscape_caption(&state.db, admin.user_id, &template).await?;
    info!(user_id = admin.user_id, "landscape caption updated");

    let row = user_config::get_or_create(&state.db, admin.user_id).await?;
    Ok(Json(row.into()))
}

async fn set_landscape(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<LandscapeBody>,
) -> Result<Json<ConfigResponse>, AppError> {
    user_config::set_landscape_mode(&state.db, admin.user_id, body.enabled).await?;
    info!(user_id = admin.user_id, enabled = body.enabled, "landscape mode changed");

    let row = user_config::get_or_create(&state.db, admin.user_id).await?;
    Ok(Json(row.into()))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StatusResponse {
    database: &'static str,
    user_configs: i64,
    cache_entries: i64,
    structured_source: bool,
    scraped_source: bool,
    posters: bool,
}

async fn status(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<StatusResponse>, AppError> {
    let database = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => "connected",
        Err(_) => "unavailable",
    };

    Ok(Json(StatusResponse {
        database,
        user_configs: user_config::count(&state.db).await?,
        cache_entries: cache::count(&state.db).await?,
        structured_source: state.resolver.has_structured(),
        scraped_source: true,
        posters: state.renderer.is_some(),
    }))
}
