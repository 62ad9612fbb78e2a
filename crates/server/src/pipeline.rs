//! One lookup from free-text query to deliverable message.

use marquee_core::error::ApiError;
use marquee_core::{NormalizedMedia, Orientation};
use marquee_db::repo::user_config::{self, UserConfigRow};
use marquee_metadata::resolver::{ResolveFailure, SourceTag};
use marquee_render::format_caption;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::AppError;
use crate::state::AppState;

/// What the transport sends back: an image with caption, or the caption
/// alone when no image could be produced.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub source: SourceTag,
    pub media: NormalizedMedia,
    pub caption: String,
    pub orientation: Orientation,
    pub image: Option<Vec<u8>>,
}

/// Template for the user's orientation. A blank landscape template falls
/// back to the portrait one.
pub fn caption_template(config: &UserConfigRow) -> &str {
    if config.landscape_mode && !config.landscape_caption.trim().is_empty() {
        &config.landscape_caption
    } else {
        &config.caption_template
    }
}

pub async fn deliver(state: &AppState, user_id: i64, query: &str) -> Result<Delivery, AppError> {
    let request_id = uuid::Uuid::new_v4();
    let span = info_span!("lookup", %request_id, user_id);
    run(state, user_id, query).instrument(span).await
}

async fn run(state: &AppState, user_id: i64, query: &str) -> Result<Delivery, AppError> {
    let config = user_config::get_or_create(&state.db, user_id).await?;

    let resolved = state.resolver.resolve(query).await.map_err(|e| match e {
        ResolveFailure::UnparseableQuery => ApiError::BadRequest(
            "could not understand that; try a title, optionally with a year or S01E02".into(),
        ),
        ResolveFailure::NotFound => ApiError::NotFound(e.to_string()),
    })?;

    let orientation = Orientation::from_landscape_flag(config.landscape_mode);
    let caption = format_caption(caption_template(&config), &resolved.media);

    let image = match &state.renderer {
        Some(renderer) => match renderer.render(&resolved.media, &caption, orientation).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "poster unavailable, sending text only");
                None
            }
        },
        None => {
            debug!("posters disabled");
            None
        }
    };

    info!(
        source = resolved.source.as_str(),
        source_id = %resolved.media.source_id,
        %orientation,
        with_image = image.is_some(),
        "lookup delivered"
    );

    Ok(Delivery {
        source: resolved.source,
        media: resolved.media,
        caption,
        orientation,
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::{DEFAULT_CAPTION, DEFAULT_LANDSCAPE_CAPTION};

    fn row(landscape_mode: bool, landscape_caption: &str) -> UserConfigRow {
        UserConfigRow {
            user_id: 1,
            caption_template: DEFAULT_CAPTION.to_string(),
            landscape_mode,
            landscape_caption: landscape_caption.to_string(),
            created_ts: 0,
            updated_ts: 0,
        }
    }

    #[test]
    fn portrait_uses_caption_template() {
        assert_eq!(caption_template(&row(false, DEFAULT_LANDSCAPE_CAPTION)), DEFAULT_CAPTION);
    }

    #[test]
    fn landscape_uses_landscape_caption() {
        assert_eq!(
            caption_template(&row(true, DEFAULT_LANDSCAPE_CAPTION)),
            DEFAULT_LANDSCAPE_CAPTION
        );
    }

    #[test]
    fn blank_landscape_caption_falls_back() {
        assert_eq!(caption_template(&row(true, "  ")), DEFAULT_CAPTION);
    }
}
