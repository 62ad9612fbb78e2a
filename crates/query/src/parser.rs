use marquee_core::SearchIntent;
use regex::Regex;
use std::sync::LazyLock;

// S01E05, s1e5
static RE_SXXEXX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)s(\d+)e(\d+)").unwrap());

// "Season 1 Episode 5"
static RE_SEASON_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)season\s+(\d+)\s+episode\s+(\d+)").unwrap());

// 1x05
static RE_XEP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)x(\d+)").unwrap());

static RE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// First `(season, episode)` pair matched by `re`. Zero or overflowing
/// numbers count as no match.
fn capture_pair(re: &Regex, text: &str) -> Option<(u32, u32)> {
    let caps = re.captures(text)?;
    let season: u32 = caps[1].parse().ok()?;
    let episode: u32 = caps[2].parse().ok()?;
    if season == 0 || episode == 0 {
        return None;
    }
    Some((season, episode))
}

fn clean_title(raw: &str) -> String {
    RE_WHITESPACE
        .replace_all(raw, " ")
        .trim_matches(|c: char| c == '-' || c.is_whitespace())
        .to_string()
}

/// Parse a free-text query into a [`SearchIntent`].
///
/// Season/episode markers are stripped before the year search runs, so the
/// two extractions are applied in that fixed order. A 4-digit number in the
/// 1900–2099 range is always taken as the year, even when it belongs to the
/// title. An empty `title` in the result means the query was unparseable.
pub fn parse_query(query: &str) -> SearchIntent {
    let query = query.trim();
    if query.is_empty() {
        return SearchIntent::default();
    }

    let mut intent = SearchIntent::default();

    let working = if let Some((season, episode)) = capture_pair(&RE_SXXEXX, query) {
        intent.season = Some(season);
        intent.episode = Some(episode);
        RE_SXXEXX.replace_all(query, "").into_owned()
    } else if let Some((season, episode)) = capture_pair(&RE_SEASON_EPISODE, query) {
        intent.season = Some(season);
        intent.episode = Some(episode);
        RE_SEASON_EPISODE.replace_all(query, "").into_owned()
    } else {
        query.to_string()
    };

    let working = match RE_YEAR.find(&working) {
        Some(m) => {
            intent.year = m.as_str().parse().ok();
            RE_YEAR.replace_all(&working, "").into_owned()
        }
        None => working,
    };

    intent.title = clean_title(&working);
    intent
}

/// Find a season/episode pair in `S01E01`, `Season 1 Episode 1` or `1x01`
/// form, trying them in that order.
pub fn extract_season_episode(text: &str) -> Option<(u32, u32)> {
    if text.is_empty() {
        return None;
    }

    capture_pair(&RE_SXXEXX, text)
        .or_else(|| capture_pair(&RE_SEASON_EPISODE, text))
        .or_else(|| capture_pair(&RE_XEP, text))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(title: &str, year: Option<i32>, se: Option<(u32, u32)>) -> SearchIntent {
        SearchIntent {
            title: title.into(),
            year,
            season: se.map(|(s, _)| s),
            episode: se.map(|(_, e)| e),
        }
    }

    #[test]
    fn parse_compact_marker() {
        assert_eq!(
            parse_query("Breaking Bad S01E05"),
            intent("Breaking Bad", None, Some((1, 5)))
        );
    }

    #[test]
    fn parse_compact_marker_lowercase() {
        assert_eq!(
            parse_query("the office s2e10"),
            intent("the office", None, Some((2, 10)))
        );
    }

    #[test]
    fn parse_verbose_marker() {
        assert_eq!(
            parse_query("Game of Thrones Season 1  Episode 9"),
            intent("Game of Thrones", None, Some((1, 9)))
        );
    }

    #[test]
    fn parse_year() {
        assert_eq!(parse_query("The Matrix 1999"), intent("The Matrix", Some(1999), None));
    }

    #[test]
    fn parse_year_and_marker() {
        assert_eq!(
            parse_query("Doctor Who 2005 S02E03"),
            intent("Doctor Who", Some(2005), Some((2, 3)))
        );
    }

    #[test]
    fn strips_hyphens_and_collapses_whitespace() {
        assert_eq!(
            parse_query("  Blade   Runner - 1982 "),
            intent("Blade Runner", Some(1982), None)
        );
    }

    #[test]
    fn out_of_range_number_is_kept_in_title() {
        assert_eq!(parse_query("Blade Runner 2049"), intent("Blade Runner", Some(2049), None));
        assert_eq!(parse_query("Apollo 13"), intent("Apollo 13", None, None));
        assert_eq!(parse_query("THX 1138"), intent("THX 1138", None, None));
    }

    #[test]
    fn empty_queries_are_unparseable() {
        assert!(parse_query("").is_unparseable());
        assert!(parse_query("   ").is_unparseable());
        assert!(parse_query("S01E01").is_unparseable());
        assert!(parse_query(" - ").is_unparseable());
    }

    #[test]
    fn year_only_title_is_a_known_limitation() {
        let parsed = parse_query("1917");
        assert_eq!(parsed.year, Some(1917));
        assert!(parsed.is_unparseable());
    }

    #[test]
    fn zero_season_is_not_a_marker() {
        let parsed = parse_query("Show S00E01");
        assert_eq!(parsed.season, None);
        assert_eq!(parsed.title, "Show S00E01");
    }

    #[test]
    fn extract_tries_each_form() {
        assert_eq!(extract_season_episode("Lost S04E08"), Some((4, 8)));
        assert_eq!(extract_season_episode("Lost season 4 episode 8"), Some((4, 8)));
        assert_eq!(extract_season_episode("Seinfeld 3x12"), Some((3, 12)));
        assert_eq!(extract_season_episode("Seinfeld"), None);
        assert_eq!(extract_season_episode(""), None);
    }

    #[test]
    fn extract_prefers_compact_form() {
        assert_eq!(extract_season_episode("2x01 S03E04"), Some((3, 4)));
    }
}
