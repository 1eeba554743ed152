pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod testing;
pub mod types;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    // Credential submission routes carry the per-client rate limit; token
    // exchange and logout do their own verification and stay unthrottled.
    let credential_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register_post))
        .route("/auth/login", post(handlers::auth::login_post))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ));

    let session_routes = Router::new()
        .route("/auth/refresh", post(handlers::auth::refresh_post))
        .route("/auth/logout", post(handlers::auth::logout_post));

    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me_get))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(credential_routes)
        .merge(session_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Rifas Solidarias API",
            "version": version,
            "description": "Authentication backend for the solidarity raffle platform",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "register": "POST /auth/register (public, rate limited)",
                "login": "POST /auth/login (public, rate limited)",
                "refresh": "POST /auth/refresh (public - token exchange)",
                "logout": "POST /auth/logout (public - token revocation)",
                "me": "GET /auth/me (protected)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let database = match &state.pool {
        Some(pool) => match database::health_check(pool).await {
            Ok(()) => "ok",
            Err(e) => {
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "success": false,
                        "error": "database unavailable",
                        "data": {
                            "status": "degraded",
                            "timestamp": now,
                            "database_error": e.to_string()
                        }
                    })),
                );
            }
        },
        None => "not configured",
    };

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "status": "ok",
                "timestamp": now,
                "database": database
            }
        })),
    )
}
