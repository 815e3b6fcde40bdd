//! Nestmate Server — Application entry point.

use nestmate_db::{DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("nestmate=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Nestmate server...");

    let config = DbConfig::from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(m) => m,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(e) = nestmate_db::run_migrations(manager.client()).await {
        tracing::error!(error = %e, "migrations failed");
        std::process::exit(1);
    }

    // TODO: Start REST API server

    tracing::info!("Nestmate server stopped.");
}
