//! Configuration management for the Stockroom server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with STOCKROOM prefix

use chrono::{FixedOffset, Offset, Utc};
use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    pub jwt: JwtConfig,

    /// Timezone used to bucket dashboard series
    pub reporting: ReportingConfig,

    /// Background stock status reconciliation
    pub sweep: SweepConfig,

    pub image_storage: ImageStorageConfig,

    pub smtp: SmtpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Run embedded migrations at start-up outside development
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Token lifetime in days
    pub expiry_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportingConfig {
    /// Offset from UTC in minutes, e.g. 330 for +05:30
    pub utc_offset_minutes: i32,
}

impl ReportingConfig {
    /// The reporting timezone; out-of-range offsets fall back to UTC
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    pub enabled: bool,

    /// Seconds between all-tenant sweeps
    pub interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImageStorageConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,

    /// Folder uploaded product images are placed in
    pub folder: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,

    /// Sender address for outgoing mail
    pub from: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("STOCKROOM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 5000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.run_migrations", false)?
            .set_default("jwt.expiry_days", 7)?
            .set_default("reporting.utc_offset_minutes", 330)?
            .set_default("sweep.enabled", true)?
            .set_default("sweep.interval_secs", 3600)?
            .set_default("image_storage.folder", "inventory_products")?
            .set_default("smtp.from", "Stockroom <no-reply@stockroom.local>")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (STOCKROOM prefix)
            .add_source(
                Environment::with_prefix("STOCKROOM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Whether embedded migrations should run at start-up
    pub fn should_migrate(&self) -> bool {
        self.environment == "development" || self.database.run_migrations
    }
}
