//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database.
    /// Env: `DB_PATH`
    /// Default: `./taskforge.db`
    pub db_path: PathBuf,

    /// HMAC secret for signing access tokens.
    /// Env: `JWT_SECRET`
    /// Default: a fixed development-only value.
    pub jwt_secret: String,

    /// Access token lifetime in seconds.
    /// Env: `TOKEN_TTL_SECS`
    /// Default: `86400` (24 hours)
    pub token_ttl_secs: i64,

    /// Credentials for the seeded admin account.
    /// Env: `ADMIN_USERNAME` / `ADMIN_PASSWORD` / `ADMIN_EMAIL`
    pub admin_username: String,
    pub admin_password: String,
    pub admin_email: String,
}

const DEV_JWT_SECRET: &str = "taskforge-dev-secret";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            db_path: PathBuf::from("./taskforge.db"),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_secs: 86_400,
            admin_username: "admin".to_string(),
            admin_password: "admin1234".to_string(),
            admin_email: "admin@taskforge.local".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Ok(secret) = std::env::var("JWT_SECRET") {
            if !secret.is_empty() {
                config.jwt_secret = secret;
            }
        }
        if config.jwt_secret == DEV_JWT_SECRET {
            tracing::warn!("JWT_SECRET not set, using the development default");
        }

        if let Ok(val) = std::env::var("TOKEN_TTL_SECS") {
            if let Ok(secs) = val.parse::<i64>() {
                config.token_ttl_secs = secs;
            } else {
                tracing::warn!(value = %val, "Invalid TOKEN_TTL_SECS, using default");
            }
        }

        if let Ok(name) = std::env::var("ADMIN_USERNAME") {
            config.admin_username = name;
        }
        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            config.admin_password = password;
        }
        if let Ok(email) = std::env::var("ADMIN_EMAIL") {
            config.admin_email = email;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
