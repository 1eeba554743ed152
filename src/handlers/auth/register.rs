// handlers/auth/register.rs - POST /auth/register

use axum::extract::{Json, State};

use crate::auth::service::{RegisterInput, SessionBundle};
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Register a new account and return its first session token pair.
///
/// 400 on missing/invalid fields or an inactive institution reference,
/// 409 when the email or national id is already taken.
pub async fn register_post(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> ApiResult<SessionBundle> {
    let bundle = state.auth.register(input).await?;
    Ok(ApiResponse::created(bundle))
}
