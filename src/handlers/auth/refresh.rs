// handlers/auth/refresh.rs - POST /auth/refresh

use axum::extract::{Json, State};
use serde::Deserialize;

use crate::auth::service::RefreshedToken;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Exchange a refresh token for a new access token. The refresh token
/// itself is not rotated.
pub async fn refresh_post(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<RefreshedToken> {
    let token = body
        .refresh_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("Refresh token required"))?;

    let refreshed = state.auth.refresh(token).await?;
    Ok(ApiResponse::success(refreshed))
}
