pub mod cache;
pub mod user_config;
