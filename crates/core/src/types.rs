use serde::{Deserialize, Serialize};

/// Literal placeholder for any field a provider could not resolve.
pub const NOT_AVAILABLE: &str = "N/A";

/// Portrait caption used until a user stores their own.
pub const DEFAULT_CAPTION: &str = "{title} ({year})\n\
Language: {language}\n\
Rating: {rating}/10\n\
Genre: {genre}\n\
Director: {director}\n\
Plot: {plot}";

/// Landscape caption used until a user stores their own.
pub const DEFAULT_LANDSCAPE_CAPTION: &str = "{title} | {year} | {rating}";

/// Structured search intent produced from a free-text query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchIntent {
    pub title: String,
    pub year: Option<i32>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl SearchIntent {
    /// An empty title means the query could not be parsed.
    pub fn is_unparseable(&self) -> bool {
        self.title.is_empty()
    }

    pub fn has_season_episode(&self) -> bool {
        self.season.is_some() || self.episode.is_some()
    }
}

/// Media kind, exposed to caption templates as `{type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata provider that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Tmdb,
    Imdb,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tmdb => "tmdb",
            Self::Imdb => "imdb",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Poster orientation selected per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn from_landscape_flag(landscape: bool) -> Self {
        if landscape {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A specific episode overlaid on a show-level record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeDetails {
    pub season: u32,
    pub episode: u32,
    pub title: String,
    pub plot: String,
}

/// Kind-specific part of a [`NormalizedMedia`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaDetails {
    Movie {
        runtime: String,
    },
    Tv {
        seasons: String,
        episodes: String,
        episode: Option<EpisodeDetails>,
    },
}

/// Canonical record every metadata source maps into.
///
/// Text fields are never empty: anything the upstream did not provide holds
/// [`NOT_AVAILABLE`]. Records are built once per lookup and never edited in
/// place; [`NormalizedMedia::with_episode`] returns a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMedia {
    pub provider: Provider,
    pub source_id: String,
    pub title: String,
    pub original_title: String,
    pub year: String,
    pub language: String,
    pub genres: String,
    pub rating: String,
    pub plot: String,
    pub director: String,
    pub cast: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub details: MediaDetails,
}

impl NormalizedMedia {
    /// A record of the given kind with every text field set to `N/A`.
    pub fn placeholder(provider: Provider, source_id: impl Into<String>, kind: MediaKind) -> Self {
        let details = match kind {
            MediaKind::Movie => MediaDetails::Movie {
                runtime: NOT_AVAILABLE.to_string(),
            },
            MediaKind::Tv => MediaDetails::Tv {
                seasons: NOT_AVAILABLE.to_string(),
                episodes: NOT_AVAILABLE.to_string(),
                episode: None,
            },
        };

        Self {
            provider,
            source_id: source_id.into(),
            title: NOT_AVAILABLE.to_string(),
            original_title: NOT_AVAILABLE.to_string(),
            year: NOT_AVAILABLE.to_string(),
            language: NOT_AVAILABLE.to_string(),
            genres: NOT_AVAILABLE.to_string(),
            rating: NOT_AVAILABLE.to_string(),
            plot: NOT_AVAILABLE.to_string(),
            director: NOT_AVAILABLE.to_string(),
            cast: NOT_AVAILABLE.to_string(),
            poster_url: None,
            backdrop_url: None,
            details,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self.details {
            MediaDetails::Movie { .. } => MediaKind::Movie,
            MediaDetails::Tv { .. } => MediaKind::Tv,
        }
    }

    pub fn runtime(&self) -> &str {
        match &self.details {
            MediaDetails::Movie { runtime } => runtime,
            MediaDetails::Tv { .. } => NOT_AVAILABLE,
        }
    }

    pub fn seasons(&self) -> &str {
        match &self.details {
            MediaDetails::Tv { seasons, .. } => seasons,
            MediaDetails::Movie { .. } => NOT_AVAILABLE,
        }
    }

    pub fn episodes(&self) -> &str {
        match &self.details {
            MediaDetails::Tv { episodes, .. } => episodes,
            MediaDetails::Movie { .. } => NOT_AVAILABLE,
        }
    }

    pub fn episode(&self) -> Option<&EpisodeDetails> {
        match &self.details {
            MediaDetails::Tv { episode, .. } => episode.as_ref(),
            MediaDetails::Movie { .. } => None,
        }
    }

    /// Returns a copy with the episode overlaid. Show-level fields are kept;
    /// movies are returned unchanged.
    pub fn with_episode(&self, episode: EpisodeDetails) -> Self {
        let mut enriched = self.clone();
        if let MediaDetails::Tv { episode: slot, .. } = &mut enriched.details {
            *slot = Some(episode);
        }
        enriched
    }

    /// Artwork URL for the orientation: landscape prefers the backdrop.
    pub fn artwork_url(&self, orientation: Orientation) -> Option<&str> {
        match orientation {
            Orientation::Landscape => self
                .backdrop_url
                .as_deref()
                .or(self.poster_url.as_deref()),
            Orientation::Portrait => self.poster_url.as_deref(),
        }
    }
}

/// Trimmed text, or `N/A` when absent or blank.
pub fn text_or_na(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Comma-joined list, or `N/A` when nothing non-blank remains.
pub fn join_or_na<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = items
        .into_iter()
        .filter_map(|s| {
            let t = s.as_ref().trim();
            if t.is_empty() { None } else { Some(t.to_string()) }
        })
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        joined
    }
}
