//! IMDb HTML scraper.
//!
//! IMDb has no public API, so titles are resolved by fetching the find page
//! and the title page and reading them with CSS selectors. Every field is
//! extracted on its own; a missing element only blanks that field.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use marquee_core::types::{join_or_na, text_or_na};
use marquee_core::{MediaDetails, NOT_AVAILABLE, NormalizedMedia, Provider};

use crate::MetadataError;
use crate::cache::{DEFAULT_TTL_SECS, MetadataCache, search_key};
use crate::provider::ScrapedSource;

pub const DEFAULT_BASE_URL: &str = "https://www.imdb.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const TOP_CAST: usize = 5;

/// Allowed distance between the requested year and a search row's year.
const YEAR_TOLERANCE: i32 = 1;

static RE_TITLE_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/title/(tt\d+)").unwrap());

static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

static RE_TV_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"TV Series|TV Mini Series|TV Movie").unwrap());

static RE_EPISODES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+) episodes").unwrap());

// Thumbnail crop -> 500x750 poster.
static RE_POSTER_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"UX\d+_CR\d+,\d+,\d+,\d+_AL_").unwrap());

const POSTER_SIZE: &str = "UX500_CR0,0,500,750_AL_";

#[derive(Debug, Clone)]
pub struct ImdbConfig {
    pub base_url: String,
    pub cache_ttl_secs: i64,
}

impl Default for ImdbConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

pub struct ImdbScraper {
    config: ImdbConfig,
    client: reqwest::Client,
    cache: MetadataCache,
}

impl ImdbScraper {
    pub fn new(config: ImdbConfig, client: reqwest::Client, cache: MetadataCache) -> Self {
        Self {
            config,
            client,
            cache,
        }
    }

    async fn fetch_html(&self, path: &str, query: &[(&str, &str)]) -> Result<String, MetadataError> {
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        debug!(url = %url, "IMDb request");

        let resp = self
            .client
            .get(&url)
            .query(query)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MetadataError::NotFound);
        }

        if !resp.status().is_success() {
            return Err(MetadataError::Provider(format!(
                "IMDb returned {}",
                resp.status()
            )));
        }

        Ok(resp.text().await?)
    }
}

#[async_trait::async_trait]
impl ScrapedSource for ImdbScraper {
    fn name(&self) -> &str {
        "imdb"
    }

    async fn search_title(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Option<String>, MetadataError> {
        let key = search_key("imdb_search", title, year);
        if let Some(id) = self.cache.get::<String>(&key).await {
            return Ok(Some(id));
        }

        let query = match year {
            Some(y) => format!("{title} {y}"),
            None => title.to_string(),
        };
        let html = self
            .fetch_html("/find/", &[("q", query.as_str()), ("s", "tt")])
            .await?;

        let id = parse_search_page(&html, year)?;
        match &id {
            Some(id) => self.cache.put(&key, id, self.config.cache_ttl_secs).await,
            None => debug!(title, ?year, "no IMDb match"),
        }
        Ok(id)
    }

    async fn get_title_details(&self, id: &str) -> Result<Option<NormalizedMedia>, MetadataError> {
        let key = format!("imdb_details_{id}");
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(Some(hit));
        }

        let html = self.fetch_html(&format!("/title/{id}/"), &[]).await?;
        let media = parse_title_page(id, &html)?;

        self.cache.put(&key, &media, self.config.cache_ttl_secs).await;
        Ok(Some(media))
    }
}

fn selector(css: &str) -> Result<Selector, MetadataError> {
    Selector::parse(css).map_err(|e| MetadataError::Parse(e.to_string()))
}

/// Text nodes joined by single spaces.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(doc: &Html, css: &str) -> Result<Option<String>, MetadataError> {
    let sel = selector(css)?;
    Ok(doc
        .select(&sel)
        .map(element_text)
        .find(|t| !t.is_empty()))
}

/// Title id of the first search row linking to a title page.
///
/// With a year, the row is dropped when its displayed year is more than one
/// year off. Rows that show no year are kept.
pub fn parse_search_page(html: &str, year: Option<i32>) -> Result<Option<String>, MetadataError> {
    let doc = Html::parse_document(html);
    let rows = selector(
        "td.result_text, li.find-result-item, li.ipc-metadata-list-summary-item",
    )?;
    let links = selector("a[href]")?;

    for row in doc.select(&rows) {
        let hit = row.select(&links).find_map(|a| {
            let href = a.value().attr("href")?;
            RE_TITLE_ID
                .captures(href)
                .map(|c| (c[1].to_string(), element_text(a)))
        });

        let Some((id, link_text)) = hit else {
            continue;
        };

        if let Some(wanted) = year {
            // The title itself may contain a year ("Blade Runner 2049"), so
            // only the text around the link is searched.
            let meta = element_text(row).replacen(&link_text, "", 1);
            let row_year = RE_YEAR
                .find_iter(&meta)
                .last()
                .and_then(|m| m.as_str().parse::<i32>().ok());
            if let Some(row_year) = row_year {
                if (row_year - wanted).abs() > YEAR_TOLERANCE {
                    debug!(id = %id, row_year, wanted, "first IMDb hit outside year tolerance");
                    return Ok(None);
                }
            }
        }

        return Ok(Some(id));
    }

    Ok(None)
}

/// Map an IMDb title page into a [`NormalizedMedia`].
pub fn parse_title_page(id: &str, html: &str) -> Result<NormalizedMedia, MetadataError> {
    let doc = Html::parse_document(html);
    let page_text = element_text(doc.root_element());

    let title = text_or_na(first_text(&doc, "h1")?.as_deref());

    let original_title_sel = selector("div")?;
    let original_title = doc
        .select(&original_title_sel)
        .map(element_text)
        .filter(|t| t.starts_with("Original title:"))
        .last()
        .map(|t| t.trim_start_matches("Original title:").trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| title.clone());

    let year = parse_year(&doc)?;

    let rating = text_or_na(
        first_text(
            &doc,
            r#"[data-testid="hero-rating-bar__aggregate-rating__score"] span"#,
        )?
        .as_deref(),
    );

    let genre_sel = selector(r#"a[href*="genres="]"#)?;
    let mut genres: Vec<String> = Vec::new();
    for g in doc.select(&genre_sel).map(element_text) {
        if !g.is_empty() && !genres.contains(&g) {
            genres.push(g);
        }
    }

    let language_sel = selector(r#"li[data-testid="title-details-languages"] a"#)?;
    let language = join_or_na(doc.select(&language_sel).map(element_text));

    let plot = match first_text(
        &doc,
        r#"span[data-testid="plot-xl"], span[data-testid="plot-l"], span[data-testid="plot-xs_to_m"]"#,
    )? {
        Some(p) => p,
        None => {
            let meta = selector(r#"meta[name="description"]"#)?;
            text_or_na(
                doc.select(&meta)
                    .next()
                    .and_then(|m| m.value().attr("content")),
            )
        }
    };

    let director_block = selector(r#"li[data-testid="title-pc-principal-credit"]"#)?;
    let person_links = selector(r#"a[href*="/name/nm"]"#)?;
    let director = join_or_na(
        doc.select(&director_block)
            .next()
            .into_iter()
            .flat_map(|block| block.select(&person_links))
            .map(element_text),
    );

    let cast_sel = selector(r#"[data-testid="title-cast-item__actor"]"#)?;
    let cast = join_or_na(doc.select(&cast_sel).take(TOP_CAST).map(element_text));

    let poster_sel = selector(
        r#"img[data-testid="hero-media__poster"], [data-testid="hero-media__poster"] img"#,
    )?;
    let poster_url = doc
        .select(&poster_sel)
        .find_map(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(|src| RE_POSTER_SIZE.replace(src, POSTER_SIZE).into_owned());

    let details = if RE_TV_MARKER.is_match(&page_text) {
        let span_sel = selector("span")?;
        let episodes = doc
            .select(&span_sel)
            .map(element_text)
            .find_map(|t| RE_EPISODES.captures(&t).map(|c| c[1].to_string()))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        MediaDetails::Tv {
            seasons: NOT_AVAILABLE.to_string(),
            episodes,
            episode: None,
        }
    } else {
        let runtime = first_text(&doc, r#"li[data-testid="title-techspec_runtime"]"#)?
            .map(|t| t.trim_start_matches("Runtime").trim().to_string());
        MediaDetails::Movie {
            runtime: text_or_na(runtime.as_deref()),
        }
    };

    Ok(NormalizedMedia {
        provider: Provider::Imdb,
        source_id: id.to_string(),
        title,
        original_title,
        year,
        language,
        genres: join_or_na(&genres),
        rating,
        plot,
        director,
        cast,
        poster_url,
        backdrop_url: None,
        details,
    })
}

/// Release-info link year, falling back to the `<title>` tag.
fn parse_year(doc: &Html) -> Result<String, MetadataError> {
    let release_sel = selector(r#"a[href*="releaseinfo"]"#)?;
    let from_link = doc
        .select(&release_sel)
        .map(element_text)
        .find_map(|t| RE_YEAR.find(&t).map(|m| m.as_str().to_string()));
    if let Some(year) = from_link {
        return Ok(year);
    }

    let from_title = first_text(doc, "title")?
        .and_then(|t| RE_YEAR.find(&t).map(|m| m.as_str().to_string()));
    Ok(from_title.unwrap_or_else(|| NOT_AVAILABLE.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::MediaKind;

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <ul>
            <li class="ipc-metadata-list-summary-item">
              <a href="/name/nm0000206/">Keanu Reeves</a>
            </li>
            <li class="ipc-metadata-list-summary-item">
              <a href="/title/tt0133093/?ref_=fn_al_tt_1">The Matrix</a>
              <span>1999</span>
            </li>
            <li class="ipc-metadata-list-summary-item">
              <a href="/title/tt0234215/">The Matrix Reloaded</a>
              <span>2003</span>
            </li>
          </ul>
        </body></html>
    "#;

    const MOVIE_PAGE: &str = r#"
        <html>
          <head>
            <title>The Matrix (1999) - IMDb</title>
            <meta name="description" content="Fallback plot.">
          </head>
          <body>
            <h1 data-testid="hero__pageTitle"><span>The Matrix</span></h1>
            <div>Original title: Matrix</div>
            <ul><li><a href="/title/tt0133093/releaseinfo">1999</a></li></ul>
            <div data-testid="hero-rating-bar__aggregate-rating__score"><span>8.7</span><span>/10</span></div>
            <div data-testid="genres">
              <a href="/search/title?genres=action">Action</a>
              <a href="/search/title?genres=sci-fi">Sci-Fi</a>
              <a href="/search/title?genres=action">Action</a>
            </div>
            <span data-testid="plot-xl">A computer hacker learns about the true nature of reality.</span>
            <ul>
              <li data-testid="title-pc-principal-credit">
                <span>Directors</span>
                <a href="/name/nm0905154/">Lana Wachowski</a>
                <a href="/name/nm0905152/">Lilly Wachowski</a>
              </li>
              <li data-testid="title-pc-principal-credit">
                <span>Stars</span>
                <a href="/name/nm0000206/">Keanu Reeves</a>
              </li>
            </ul>
            <a data-testid="title-cast-item__actor" href="/name/nm0000206/">Keanu Reeves</a>
            <a data-testid="title-cast-item__actor" href="/name/nm0000401/">Laurence Fishburne</a>
            <a data-testid="title-cast-item__actor" href="/name/nm0005251/">Carrie-Anne Moss</a>
            <a data-testid="title-cast-item__actor" href="/name/nm0915989/">Hugo Weaving</a>
            <a data-testid="title-cast-item__actor" href="/name/nm0001592/">Joe Pantoliano</a>
            <a data-testid="title-cast-item__actor" href="/name/nm0000191/">Marcus Chong</a>
            <li data-testid="title-details-languages"><span>Language</span><a href="/search/title?title_type=feature&amp;primary_language=en">English</a></li>
            <li data-testid="title-techspec_runtime"><span>Runtime</span><div>2 hours 16 minutes</div></li>
            <div data-testid="hero-media__poster">
              <img src="https://m.media-amazon.com/images/M/abc._V1_QL75_UX190_CR0,0,190,281_AL_.jpg">
            </div>
          </body>
        </html>
    "#;

    const SERIES_PAGE: &str = r#"
        <html>
          <head><title>Breaking Bad (TV Series 2008–2013) - IMDb</title></head>
          <body>
            <h1>Breaking Bad</h1>
            <ul><li>TV Series</li><li><a href="/title/tt0903747/releaseinfo">2008–2013</a></li></ul>
            <section><h3>Episodes</h3><span>62 episodes</span></section>
          </body>
        </html>
    "#;

    #[test]
    fn search_skips_rows_without_title_links() {
        assert_eq!(
            parse_search_page(SEARCH_PAGE, None).unwrap().as_deref(),
            Some("tt0133093")
        );
    }

    #[test]
    fn search_year_tolerance_is_one() {
        assert_eq!(
            parse_search_page(SEARCH_PAGE, Some(2000)).unwrap().as_deref(),
            Some("tt0133093")
        );
        assert_eq!(parse_search_page(SEARCH_PAGE, Some(2001)).unwrap(), None);
    }

    #[test]
    fn year_in_title_is_not_the_release_year() {
        let html = r#"
            <ul><li class="ipc-metadata-list-summary-item">
              <a href="/title/tt1856101/">Blade Runner 2049</a><span>2017</span>
            </li></ul>
        "#;
        assert_eq!(
            parse_search_page(html, Some(2017)).unwrap().as_deref(),
            Some("tt1856101")
        );
        assert_eq!(parse_search_page(html, Some(2049)).unwrap(), None);
    }

    #[test]
    fn search_without_results_is_absent() {
        assert_eq!(
            parse_search_page("<html><body><p>No results</p></body></html>", None).unwrap(),
            None
        );
    }

    #[test]
    fn parse_movie_page() {
        let m = parse_title_page("tt0133093", MOVIE_PAGE).unwrap();
        assert_eq!(m.kind(), MediaKind::Movie);
        assert_eq!(m.title, "The Matrix");
        assert_eq!(m.original_title, "Matrix");
        assert_eq!(m.year, "1999");
        assert_eq!(m.rating, "8.7");
        assert_eq!(m.genres, "Action, Sci-Fi");
        assert_eq!(m.language, "English");
        assert_eq!(m.plot, "A computer hacker learns about the true nature of reality.");
        assert_eq!(m.director, "Lana Wachowski, Lilly Wachowski");
        assert_eq!(
            m.cast,
            "Keanu Reeves, Laurence Fishburne, Carrie-Anne Moss, Hugo Weaving, Joe Pantoliano"
        );
        assert_eq!(m.runtime(), "2 hours 16 minutes");
        assert_eq!(
            m.poster_url.as_deref(),
            Some("https://m.media-amazon.com/images/M/abc._V1_QL75_UX500_CR0,0,500,750_AL_.jpg")
        );
    }

    #[test]
    fn parse_series_page() {
        let m = parse_title_page("tt0903747", SERIES_PAGE).unwrap();
        assert_eq!(m.kind(), MediaKind::Tv);
        assert_eq!(m.year, "2008");
        assert_eq!(m.episodes(), "62");
        assert_eq!(m.seasons(), NOT_AVAILABLE);
        assert_eq!(m.original_title, "Breaking Bad");
    }

    #[test]
    fn empty_page_degrades_to_placeholders() {
        let m = parse_title_page("tt0000001", "<html><body></body></html>").unwrap();
        assert_eq!(m.title, NOT_AVAILABLE);
        assert_eq!(m.year, NOT_AVAILABLE);
        assert_eq!(m.rating, NOT_AVAILABLE);
        assert_eq!(m.genres, NOT_AVAILABLE);
        assert_eq!(m.language, NOT_AVAILABLE);
        assert_eq!(m.plot, NOT_AVAILABLE);
        assert_eq!(m.director, NOT_AVAILABLE);
        assert_eq!(m.cast, NOT_AVAILABLE);
        assert_eq!(m.runtime(), NOT_AVAILABLE);
        assert!(m.poster_url.is_none());
    }

    mod upstream {
        use super::*;
        use crate::cache::tests::memory_pool;
        use axum::Router;
        use axum::extract::State;
        use axum::routing::get;
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[tokio::test]
        async fn search_and_details_are_cached_separately() {
            let hits: Arc<AtomicUsize> = Arc::default();
            let router = Router::new()
                .route(
                    "/find/",
                    get(|State(hits): State<Arc<AtomicUsize>>| async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        axum::response::Html(SEARCH_PAGE)
                    }),
                )
                .route(
                    "/title/tt0133093/",
                    get(|State(hits): State<Arc<AtomicUsize>>| async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        axum::response::Html(MOVIE_PAGE)
                    }),
                )
                .with_state(hits.clone());

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

            let scraper = ImdbScraper::new(
                ImdbConfig {
                    base_url: format!("http://{addr}"),
                    ..Default::default()
                },
                reqwest::Client::new(),
                MetadataCache::new(memory_pool().await),
            );

            let first = scraper
                .search_and_get_details("The Matrix", Some(1999))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(first.source_id, "tt0133093");
            assert_eq!(hits.load(Ordering::SeqCst), 2);

            let again = scraper
                .search_and_get_details("The Matrix", Some(1999))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(again, first);
            assert_eq!(hits.load(Ordering::SeqCst), 2);
        }

        #[tokio::test]
        async fn missing_title_page_is_an_error() {
            let router =
                Router::new().route("/find/", get(|| async { axum::response::Html(SEARCH_PAGE) }));
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

            let scraper = ImdbScraper::new(
                ImdbConfig {
                    base_url: format!("http://{addr}"),
                    ..Default::default()
                },
                reqwest::Client::new(),
                MetadataCache::new(memory_pool().await),
            );

            let err = scraper
                .search_and_get_details("The Matrix", None)
                .await
                .unwrap_err();
            assert!(matches!(err, MetadataError::NotFound));
        }
    }
}
