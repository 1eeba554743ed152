// handlers/auth/login.rs - POST /auth/login

use axum::extract::{Json, State};
use axum::http::HeaderMap;

use crate::auth::service::{LoginInput, SessionBundle};
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// Authenticate credentials and return a fresh access/refresh pair.
///
/// Every failure path answers 401 with the same generic message except a
/// locked account, which answers 423 with the lockout expiry.
pub async fn login_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginInput>,
) -> ApiResult<SessionBundle> {
    let meta = super::client_meta(&headers);
    let bundle = state.auth.login(input, meta).await?;
    Ok(ApiResponse::success(bundle))
}
