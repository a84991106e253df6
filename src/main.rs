//! Server entry point: loads settings, connects the pool, mounts routes.
//!
//! Env vars:
//!   CONFIG_PATH  - path to config.json (default: config.json)
//!   DATABASE_URL - overrides the configured connection string

use axum::Router;
use tablegate::{auth_routes, common_routes, entity_routes, AppState, Settings};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tablegate=debug".into()),
        )
        .init();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.json".into());
    let settings = Settings::from_file(&config_path)?;
    let bind_addr = settings.bind_addr.clone();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(settings.connection_string()?)
        .await?;
    tracing::info!(provider = %settings.database_provider, "connected to database");

    let state = AppState::new(pool, settings);
    let app = Router::new()
        .merge(common_routes())
        .merge(auth_routes(state.clone()))
        .merge(entity_routes(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
