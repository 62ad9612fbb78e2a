pub mod parser;

pub use parser::{extract_season_episode, parse_query};
