// handlers/auth - HTTP surface of the auth session service, one file per
// operation.

mod login;
mod logout;
mod me;
mod refresh;
mod register;

pub use login::login_post;
pub use logout::logout_post;
pub use me::me_get;
pub use refresh::refresh_post;
pub use register::register_post;

use axum::http::HeaderMap;

use crate::database::models::ClientMeta;

/// Best-effort source address and user agent for the login attempt log.
pub(crate) fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ClientMeta { ip, user_agent }
}
