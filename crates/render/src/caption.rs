//! Caption templates: `{field}` substitution over a media record, and the
//! validator applied when a user stores a template.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use marquee_core::{NOT_AVAILABLE, NormalizedMedia, Provider};

pub const MAX_TEMPLATE_LEN: usize = 1000;

/// Variables a stored template may reference.
pub const TEMPLATE_VARIABLES: &[&str] = &[
    "title",
    "original_title",
    "year",
    "language",
    "genres",
    "genre",
    "rating",
    "plot",
    "runtime",
    "director",
    "cast",
    "season",
    "episode",
    "seasons",
    "episodes",
    "imdb_id",
    "tmdb_id",
    "type",
];

static RE_VARIABLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValidation {
    Valid,
    Invalid(String),
}

impl TemplateValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Check a template before it is stored. Rendering never depends on this.
pub fn validate_template(template: &str) -> TemplateValidation {
    if template.trim().is_empty() {
        return TemplateValidation::Invalid("Template cannot be empty".into());
    }

    if template.chars().count() > MAX_TEMPLATE_LEN {
        return TemplateValidation::Invalid(format!(
            "Template is too long (max {MAX_TEMPLATE_LEN} characters)"
        ));
    }

    // Doubled braces are literal text, not variables.
    let unescaped = template.replace("{{", "").replace("}}", "");
    let mut invalid: Vec<&str> = Vec::new();
    for caps in RE_VARIABLE.captures_iter(&unescaped) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        if !TEMPLATE_VARIABLES.contains(&name) && !invalid.contains(&name) {
            invalid.push(name);
        }
    }

    if invalid.is_empty() {
        TemplateValidation::Valid
    } else {
        TemplateValidation::Invalid(format!("Invalid variables: {}", invalid.join(", ")))
    }
}

/// Turn literal `\n` sequences typed by a user into newlines.
pub fn unescape_newlines(template: &str) -> String {
    template.replace("\\n", "\n")
}

/// Rating to one decimal place when numeric, unchanged otherwise.
fn format_rating(rating: &str) -> String {
    match rating.trim().parse::<f64>() {
        Ok(r) if r.is_finite() => format!("{r:.1}"),
        _ => rating.to_string(),
    }
}

/// Every substitutable field of a record, coerced to text.
pub fn field_map(media: &NormalizedMedia) -> HashMap<&'static str, String> {
    let na = || NOT_AVAILABLE.to_string();
    let episode = media.episode();
    let id_for = |provider: Provider| {
        if media.provider == provider {
            media.source_id.clone()
        } else {
            na()
        }
    };

    HashMap::from([
        ("title", media.title.clone()),
        ("original_title", media.original_title.clone()),
        ("year", media.year.clone()),
        ("type", media.kind().to_string()),
        ("language", media.language.clone()),
        ("genres", media.genres.clone()),
        ("genre", media.genres.clone()),
        ("rating", format_rating(&media.rating)),
        ("plot", media.plot.clone()),
        ("runtime", media.runtime().to_string()),
        ("director", media.director.clone()),
        ("cast", media.cast.clone()),
        ("season", episode.map_or_else(na, |e| e.season.to_string())),
        ("episode", episode.map_or_else(na, |e| e.episode.to_string())),
        ("episode_title", episode.map_or_else(na, |e| e.title.clone())),
        ("episode_plot", episode.map_or_else(na, |e| e.plot.clone())),
        ("seasons", media.seasons().to_string()),
        ("episodes", media.episodes().to_string()),
        ("tmdb_id", id_for(Provider::Tmdb)),
        ("imdb_id", id_for(Provider::Imdb)),
        ("source_id", media.source_id.clone()),
        ("poster_url", media.poster_url.clone().unwrap_or_else(na)),
        ("backdrop_url", media.backdrop_url.clone().unwrap_or_else(na)),
    ])
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown field {{{0}}}")]
    UnknownField(String),
    #[error("unbalanced brace at offset {0}")]
    UnbalancedBrace(usize),
}

/// Substitute `{name}` tokens. `{{` and `}}` are literal braces.
pub fn render_template(
    template: &str,
    fields: &HashMap<&'static str, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for (_, n) in chars.by_ref() {
                    if n == '}' {
                        closed = true;
                        break;
                    }
                    if n == '{' {
                        return Err(TemplateError::UnbalancedBrace(pos));
                    }
                    name.push(n);
                }
                if !closed {
                    return Err(TemplateError::UnbalancedBrace(pos));
                }
                match fields.get(name.as_str()) {
                    Some(value) => out.push_str(value),
                    None => return Err(TemplateError::UnknownField(name)),
                }
            }
            '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(TemplateError::UnbalancedBrace(pos)),
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Render a caption. On any template error the raw template is returned.
pub fn format_caption(template: &str, media: &NormalizedMedia) -> String {
    match render_template(template, &field_map(media)) {
        Ok(caption) => caption,
        Err(e) => {
            warn!(error = %e, source_id = %media.source_id, "caption template failed, using it verbatim");
            template.to_string()
        }
    }
}
