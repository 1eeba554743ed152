// handlers/auth/me.rs - GET /auth/me

use axum::extract::State;
use axum::Extension;

use crate::database::models::AccountProfile;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Current account profile, re-fetched from the store by the id the route
/// guard resolved. 404 only if the account vanished in between.
pub async fn me_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<AccountProfile> {
    let profile = state.auth.get_profile(user.id).await?;
    Ok(ApiResponse::success(profile))
}
