// handlers/auth/logout.rs - POST /auth/logout

use axum::extract::{Json, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::auth::extract_bearer_token;
use crate::middleware::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Revoke whatever tokens the client presented. Best effort: calling with
/// no tokens, or twice with the same tokens, still answers 200.
pub async fn logout_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<LogoutRequest>>,
) -> ApiResponse<Value> {
    let access_token = extract_bearer_token(&headers);
    let refresh_token = body.and_then(|Json(b)| b.refresh_token);

    state
        .auth
        .logout(access_token.as_deref(), refresh_token.as_deref())
        .await;

    ApiResponse::success(json!({ "message": "Session closed" }))
}
