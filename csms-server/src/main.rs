use anyhow::Result;
use axum::{routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};

use csms_core::{LifecycleEngine, SqliteStore};
use csms_server::config::Config;
use csms_server::{api_router, AppState, Roster};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "csms"
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting civil service request lifecycle service");

    let config =
        Config::from_env().expect("Failed to load configuration from environment variables");

    let roster = match &config.seed_path {
        Some(path) => {
            info!("Loading roster seed from {}", path.display());
            Roster::load(path).expect("Failed to load roster seed")
        }
        None => {
            info!("SEED_PATH not set, using the built-in seed roster");
            Roster::seed()
        }
    };
    info!(
        "Roster loaded: {} users, {} employees",
        roster.users.len(),
        roster.employees.len()
    );

    let db_path = config.state_dir.join("csms-state.db");
    info!("Using state database: {}", db_path.display());
    let store = SqliteStore::new(&db_path).expect("Failed to initialize SQLite database");

    let directory = Arc::new(roster.directory());
    let engine = LifecycleEngine::new(Arc::new(store), directory);

    let app_state = Arc::new(AppState { engine, roster });

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(api_router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
