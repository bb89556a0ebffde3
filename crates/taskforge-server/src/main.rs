//! # taskforge-server
//!
//! HTTP backend for the TaskForge task tracker.
//!
//! This binary provides:
//! - **REST API** (axum) for todos, items, messages, participation views,
//!   and the two leaderboards
//! - **Token auth**: registration and login issuing HS256 bearer tokens,
//!   with role-gated admin operations
//! - **SQLite persistence** through `taskforge-store`

mod api;
mod auth;
mod config;
mod error;
mod seed;

use tracing::info;
use tracing_subscriber::EnvFilter;

use taskforge_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,taskforge_server=debug")),
        )
        .init();

    info!("Starting TaskForge server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        addr = %config.http_addr,
        db = %config.db_path.display(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Open the database and bootstrap roles + admin account
    // -----------------------------------------------------------------------
    let db = Database::open_at(&config.db_path)?;
    seed::run(&db, &config)?;

    let http_addr = config.http_addr;
    let state = AppState::new(db, config);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
