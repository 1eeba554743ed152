use rifas_api::config::{config, Environment};
use rifas_api::state::AppState;
use rifas_api::{app, database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_* etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rifas_api=info,tower_http=info".into()),
        )
        .init();

    let config = config();
    tracing::info!("Starting Rifas Solidarias API in {:?} mode", config.environment);

    if config.security.has_insecure_secrets() {
        if config.environment == Environment::Production {
            tracing::error!(
                "refusing to start: JWT_ACCESS_SECRET / JWT_REFRESH_SECRET must be set to distinct values in production"
            );
            std::process::exit(1);
        }
        tracing::warn!("running with development token secrets; do not expose this instance");
    }

    let pool = database::connect().await?;
    let state = AppState::for_postgres(pool, config);
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("listening on http://{}", bind_addr);

    // Expose the peer address to the rate limiter's source keying
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;
    Ok(())
}
