//! TMDB (The Movie Database) provider client.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs

use serde_json::Value;
use tracing::debug;

use marquee_core::types::{join_or_na, text_or_na};
use marquee_core::{EpisodeDetails, MediaDetails, NOT_AVAILABLE, NormalizedMedia, Provider};

use crate::MetadataError;
use crate::cache::{DEFAULT_TTL_SECS, MetadataCache, search_key};
use crate::provider::StructuredSource;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/original";

const TOP_CAST: usize = 5;

#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub api_key: String,
    pub base_url: String,
    pub image_base_url: String,
    pub cache_ttl_secs: i64,
}

impl TmdbConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            cache_ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

pub struct TmdbClient {
    config: TmdbConfig,
    client: reqwest::Client,
    cache: MetadataCache,
}

impl TmdbClient {
    pub fn new(config: TmdbConfig, client: reqwest::Client, cache: MetadataCache) -> Self {
        Self {
            config,
            client,
            cache,
        }
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, MetadataError> {
        let mut all_params = vec![("api_key", self.config.api_key.as_str())];
        all_params.extend_from_slice(params);

        let url = format!("{}/{path}", self.config.base_url.trim_end_matches('/'));
        debug!(path, "TMDB request");

        let resp = self.client.get(&url).query(&all_params).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound);
        }

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "TMDB returned {}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| MetadataError::Provider(format!("parse JSON: {e}")))
    }

    /// Id of the first-ranked search result, if any.
    async fn first_result_id(
        &self,
        path: &str,
        year_param: &str,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<String>, MetadataError> {
        let mut params = vec![("query", title)];
        let year_str = year.map(|y| y.to_string());
        if let Some(ref y) = year_str {
            params.push((year_param, y));
        }

        let data = self.get_json(path, &params).await?;
        Ok(data["results"]
            .as_array()
            .and_then(|r| r.first())
            .and_then(|r| r["id"].as_u64())
            .map(|id| id.to_string()))
    }
}

#[async_trait::async_trait]
impl StructuredSource for TmdbClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn search_movie(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<NormalizedMedia>, MetadataError> {
        let key = search_key("tmdb_movie_search", title, year);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(Some(hit));
        }

        let Some(id) = self
            .first_result_id("search/movie", "year", title, year)
            .await?
        else {
            debug!(title, ?year, "no TMDB movie match");
            return Ok(None);
        };

        let details = self.get_movie_details(&id).await?;
        if let Some(ref media) = details {
            self.cache.put(&key, media, self.config.cache_ttl_secs).await;
        }
        Ok(details)
    }

    async fn search_tv(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<NormalizedMedia>, MetadataError> {
        let key = search_key("tmdb_tv_search", title, year);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(Some(hit));
        }

        let Some(id) = self
            .first_result_id("search/tv", "first_air_date_year", title, year)
            .await?
        else {
            debug!(title, ?year, "no TMDB series match");
            return Ok(None);
        };

        let details = self.get_tv_details(&id, None, None).await?;
        if let Some(ref media) = details {
            self.cache.put(&key, media, self.config.cache_ttl_secs).await;
        }
        Ok(details)
    }

    async fn get_movie_details(&self, id: &str) -> Result<Option<NormalizedMedia>, MetadataError> {
        let key = format!("tmdb_movie_{id}");
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(Some(hit));
        }

        let details_path = format!("movie/{id}");
        let credits_path = format!("movie/{id}/credits");
        let (details, credits) = tokio::try_join!(
            self.get_json(&details_path, &[]),
            self.get_json(&credits_path, &[]),
        )?;

        let media = parse_movie(id, &details, &credits, &self.config.image_base_url);
        self.cache.put(&key, &media, self.config.cache_ttl_secs).await;
        Ok(Some(media))
    }

    async fn get_tv_details(
        &self,
        id: &str,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Result<Option<NormalizedMedia>, MetadataError> {
        let key = format!(
            "tmdb_tv_{id}_{}_{}",
            season.unwrap_or(0),
            episode.unwrap_or(0)
        );
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(Some(hit));
        }

        let data = self
            .get_json(&format!("tv/{id}"), &[("append_to_response", "credits")])
            .await?;
        let mut media = parse_series(id, &data, &self.config.image_base_url);

        if let (Some(season), Some(episode)) = (season, episode) {
            let ep = self
                .get_json(&format!("tv/{id}/season/{season}/episode/{episode}"), &[])
                .await?;
            media = media.with_episode(parse_episode(&ep, season, episode, &media.plot));
        }

        self.cache.put(&key, &media, self.config.cache_ttl_secs).await;
        Ok(Some(media))
    }
}

fn image_url(image_base: &str, path: &Value) -> Option<String> {
    path.as_str()
        .filter(|p| !p.is_empty())
        .map(|p| format!("{image_base}{p}"))
}

fn year_of(date: &Value) -> String {
    date.as_str()
        .and_then(|d| d.get(..4))
        .map_or_else(|| NOT_AVAILABLE.to_string(), str::to_string)
}

fn rating_of(vote_average: &Value) -> String {
    vote_average
        .as_f64()
        .map_or_else(|| NOT_AVAILABLE.to_string(), |r| r.to_string())
}

fn language_of(data: &Value) -> String {
    text_or_na(data["original_language"].as_str()).to_uppercase()
}

fn names(list: &Value, limit: usize) -> String {
    join_or_na(
        list.as_array()
            .into_iter()
            .flatten()
            .take(limit)
            .filter_map(|p| p["name"].as_str()),
    )
}

fn count_of(value: &Value) -> String {
    value
        .as_u64()
        .map_or_else(|| NOT_AVAILABLE.to_string(), |n| n.to_string())
}

fn parse_movie(id: &str, data: &Value, credits: &Value, image_base: &str) -> NormalizedMedia {
    let directors = credits["crew"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|p| p["job"].as_str() == Some("Director"))
        .filter_map(|p| p["name"].as_str());

    let runtime = match data["runtime"].as_u64() {
        Some(n) if n > 0 => format!("{n} min"),
        _ => NOT_AVAILABLE.to_string(),
    };

    NormalizedMedia {
        provider: Provider::Tmdb,
        source_id: id.to_string(),
        title: text_or_na(data["title"].as_str()),
        original_title: text_or_na(data["original_title"].as_str()),
        year: year_of(&data["release_date"]),
        language: language_of(data),
        genres: names(&data["genres"], usize::MAX),
        rating: rating_of(&data["vote_average"]),
        plot: text_or_na(data["overview"].as_str()),
        director: join_or_na(directors),
        cast: names(&credits["cast"], TOP_CAST),
        poster_url: image_url(image_base, &data["poster_path"]),
        backdrop_url: image_url(image_base, &data["backdrop_path"]),
        details: MediaDetails::Movie { runtime },
    }
}

fn parse_series(id: &str, data: &Value, image_base: &str) -> NormalizedMedia {
    NormalizedMedia {
        provider: Provider::Tmdb,
        source_id: id.to_string(),
        title: text_or_na(data["name"].as_str()),
        original_title: text_or_na(data["original_name"].as_str()),
        year: year_of(&data["first_air_date"]),
        language: language_of(data),
        genres: names(&data["genres"], usize::MAX),
        rating: rating_of(&data["vote_average"]),
        plot: text_or_na(data["overview"].as_str()),
        // Series have creators rather than a single director.
        director: names(&data["created_by"], usize::MAX),
        cast: names(&data["credits"]["cast"], TOP_CAST),
        poster_url: image_url(image_base, &data["poster_path"]),
        backdrop_url: image_url(image_base, &data["backdrop_path"]),
        details: MediaDetails::Tv {
            seasons: count_of(&data["number_of_seasons"]),
            episodes: count_of(&data["number_of_episodes"]),
            episode: None,
        },
    }
}

fn parse_episode(data: &Value, season: u32, episode: u32, show_plot: &str) -> EpisodeDetails {
    let plot = match data["overview"].as_str().map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => show_plot.to_string(),
    };

    EpisodeDetails {
        season,
        episode,
        title: text_or_na(data["name"].as_str()),
        plot,
    }
}
