use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use village_api::config;
use village_api::identity::HttpIdentityProvider;
use village_api::routes::{app, AppState};
use village_api::store::PgAccountDirectory;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("starting village API in {:?} mode", config.environment);

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/village_api".to_string());

    let db = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .connect_lazy(&database_url)
        .unwrap_or_else(|e| panic!("invalid DATABASE_URL: {}", e));

    let state = AppState {
        db: db.clone(),
        identity: Arc::new(HttpIdentityProvider::from_config()),
        accounts: Arc::new(PgAccountDirectory::new(db)),
    };

    let app = app(state);

    // Allow deployments to override the configured port via env
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(config.server.port);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("village API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
