pub mod artwork;
pub mod caption;
pub mod compose;
pub mod font;
pub mod layout;

pub use artwork::PosterRenderer;
pub use caption::{TemplateValidation, format_caption, validate_template};
pub use font::{CaptionFont, FontSet};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no artwork available")]
    NoArtwork,
    #[error("artwork download failed: {0}")]
    Download(String),
    #[error("image decode error: {0}")]
    Decode(String),
    #[error("image encode error: {0}")]
    Encode(String),
    #[error("font error: {0}")]
    Font(String),
    #[error("render task failed: {0}")]
    Task(String),
}
