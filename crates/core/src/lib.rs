pub mod error;
pub mod types;

pub use types::{
    DEFAULT_CAPTION, DEFAULT_LANDSCAPE_CAPTION, EpisodeDetails, MediaDetails, MediaKind,
    NOT_AVAILABLE, NormalizedMedia, Orientation, Provider, SearchIntent,
};
