use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use marquee_core::error::ApiError;
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the caller's chat user id, set by the transport.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Read the caller id from the request headers.
pub fn caller_id(parts: &Parts) -> Result<i64, ApiError> {
    let raw = parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing user id".into()))?;

    raw.trim()
        .parse()
        .map_err(|_| ApiError::Unauthorized("invalid user id".into()))
}

/// Extractor that only admits the configured admin user.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub user_id: i64,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = caller_id(parts)?;
        if user_id != state.admin_user_id {
            warn!(user_id, "unauthorized access attempt");
            return Err(ApiError::Forbidden("restricted to admin use only".into()).into());
        }
        Ok(Self { user_id })
    }
}
