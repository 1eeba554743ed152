use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::database::models::Role;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated identity resolved by the route guard and attached to the
/// request as a typed extension. Downstream handlers take
/// `Extension<AuthUser>`; there is no ambient mutable user field.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub institution_id: Option<Uuid>,
    pub institution_name: Option<String>,
}

/// Route guard for protected endpoints.
///
/// Per-request progression: extract bearer token, reject revoked tokens,
/// verify signature and expiry (with distinct failure codes so clients can
/// branch between refresh and re-login), then re-fetch the account so a
/// token cannot outlive deactivation.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers()).ok_or(ApiError::NoToken)?;

    if state.revocations.is_revoked(&token).await {
        return Err(ApiError::RevokedToken);
    }

    let claims = state.tokens.verify_access_token(&token)?;

    let account = state
        .store
        .find_by_id(claims.sub)
        .await?
        .ok_or(ApiError::UnknownUser)?;
    if !account.is_active() {
        return Err(ApiError::InactiveUser);
    }

    let auth_user = AuthUser {
        id: account.id,
        email: account.email.clone(),
        role: account.role,
        institution_id: account.institution_id,
        institution_name: account.institution_name.clone(),
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
/// Absent, non-Bearer, or empty values all count as "no token presented".
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
