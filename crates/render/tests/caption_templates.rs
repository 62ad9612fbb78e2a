use marquee_core::types::{DEFAULT_CAPTION, DEFAULT_LANDSCAPE_CAPTION};
use marquee_core::{EpisodeDetails, MediaKind, NormalizedMedia, Provider};
use marquee_render::caption::{TEMPLATE_VARIABLES, unescape_newlines};
use marquee_render::{TemplateValidation, format_caption, validate_template};

fn breaking_bad() -> NormalizedMedia {
    let mut show = NormalizedMedia::placeholder(Provider::Imdb, "tt0903747", MediaKind::Tv);
    show.title = "Breaking Bad".into();
    show.year = "2008".into();
    show.rating = "9.5".into();
    show
}

#[test]
fn default_templates_are_valid() {
    assert!(validate_template(DEFAULT_CAPTION).is_valid());
    assert!(validate_template(DEFAULT_LANDSCAPE_CAPTION).is_valid());
}

#[test]
fn landscape_default_renders_on_one_line() {
    assert_eq!(
        format_caption(DEFAULT_LANDSCAPE_CAPTION, &breaking_bad()),
        "Breaking Bad | 2008 | 9.5"
    );
}

#[test]
fn template_using_every_variable_is_valid_and_renders() {
    let template = TEMPLATE_VARIABLES
        .iter()
        .map(|v| format!("{{{v}}}"))
        .collect::<Vec<_>>()
        .join(" ");
    assert_eq!(validate_template(&template), TemplateValidation::Valid);

    let caption = format_caption(&template, &breaking_bad());
    assert_ne!(caption, template);
    assert!(!caption.contains('{'));
}

#[test]
fn user_typed_newlines_survive_validation_and_rendering() {
    let typed = unescape_newlines(r"{title}\nIMDb: {imdb_id}");
    assert!(validate_template(&typed).is_valid());

    let ep = breaking_bad().with_episode(EpisodeDetails {
        season: 1,
        episode: 1,
        title: "Pilot".into(),
        plot: "N/A".into(),
    });
    assert_eq!(format_caption(&typed, &ep), "Breaking Bad\nIMDb: tt0903747");
}

#[test]
fn unregistered_field_never_panics() {
    let template = "{title} {episode_count}";
    assert_eq!(format_caption(template, &breaking_bad()), template);
    assert!(!validate_template(template).is_valid());
}
