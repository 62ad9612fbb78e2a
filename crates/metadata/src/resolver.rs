//! Query resolution: parse, try the structured source, then fall back to
//! the scraped one.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use marquee_core::{NormalizedMedia, SearchIntent};
use marquee_query::parse_query;

use crate::MetadataError;
use crate::provider::{ScrapedSource, StructuredSource};

/// Which kind of source produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Structured,
    Scraped,
}

impl SourceTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Scraped => "scraped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ResolveFailure {
    #[error("unparseable query")]
    UnparseableQuery,
    #[error("not found in either source")]
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub media: NormalizedMedia,
    pub source: SourceTag,
}

pub type Resolution = Result<Resolved, ResolveFailure>;

pub struct Resolver {
    structured: Option<Arc<dyn StructuredSource>>,
    scraped: Arc<dyn ScrapedSource>,
}

impl Resolver {
    /// `structured` is `None` when no API key is configured.
    pub fn new(
        structured: Option<Arc<dyn StructuredSource>>,
        scraped: Arc<dyn ScrapedSource>,
    ) -> Self {
        Self { structured, scraped }
    }

    pub fn has_structured(&self) -> bool {
        self.structured.is_some()
    }

    /// Resolve a free-text query. Never retries within a source.
    pub async fn resolve(&self, query: &str) -> Resolution {
        let intent = parse_query(query);
        if intent.is_unparseable() {
            debug!(query, "query could not be parsed");
            return Err(ResolveFailure::UnparseableQuery);
        }
        self.resolve_intent(&intent).await
    }

    pub async fn resolve_intent(&self, intent: &SearchIntent) -> Resolution {
        debug!(
            title = %intent.title,
            year = ?intent.year,
            season = ?intent.season,
            episode = ?intent.episode,
            "resolving"
        );

        if let Some(structured) = &self.structured {
            if let Some(media) = try_structured(structured.as_ref(), intent).await {
                debug!(source_id = %media.source_id, "resolved from structured source");
                return Ok(Resolved {
                    media,
                    source: SourceTag::Structured,
                });
            }
            debug!("structured source had no match, falling back to scraping");
        }

        let scraped = absent_on_error(
            self.scraped
                .search_and_get_details(&intent.title, intent.year)
                .await,
            self.scraped.name(),
            "search_and_get_details",
        );

        match scraped {
            Some(media) => {
                debug!(source_id = %media.source_id, "resolved from scraped source");
                Ok(Resolved {
                    media,
                    source: SourceTag::Scraped,
                })
            }
            None => {
                debug!(title = %intent.title, "not found in either source");
                Err(ResolveFailure::NotFound)
            }
        }
    }
}

fn absent_on_error(
    result: Result<Option<NormalizedMedia>, MetadataError>,
    source: &str,
    op: &str,
) -> Option<NormalizedMedia> {
    match result {
        Ok(media) => media,
        Err(e) => {
            warn!(source, op, error = %e, "metadata source failed, treating as absent");
            None
        }
    }
}

async fn try_structured(
    source: &dyn StructuredSource,
    intent: &SearchIntent,
) -> Option<NormalizedMedia> {
    let name = source.name();

    if intent.has_season_episode() {
        let show = absent_on_error(
            source.search_tv(&intent.title, intent.year).await,
            name,
            "search_tv",
        )?;

        if let (Some(season), Some(episode)) = (intent.season, intent.episode) {
            let enriched = absent_on_error(
                source
                    .get_tv_details(&show.source_id, Some(season), Some(episode))
                    .await,
                name,
                "get_tv_details",
            );
            if let Some(enriched) = enriched {
                return Some(enriched);
            }
            debug!(season, episode, "episode enrichment unavailable, keeping show record");
        }
        return Some(show);
    }

    if let Some(movie) = absent_on_error(
        source.search_movie(&intent.title, intent.year).await,
        name,
        "search_movie",
    ) {
        return Some(movie);
    }

    absent_on_error(
        source.search_tv(&intent.title, intent.year).await,
        name,
        "search_tv",
    )
}
