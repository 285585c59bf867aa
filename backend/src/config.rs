//! Configuration management for the Quote Desk server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with QD_ prefix (`QD__JWT__SECRET`)

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT verification configuration
    pub jwt: JwtConfig,

    /// Quote defaults
    pub quotes: QuotesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
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
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret the bearer tokens are signed with
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuotesConfig {
    /// Validity window of a new quote when none is given
    pub default_validity_days: i64,

    pub default_currency: String,

    /// Tax rate applied when a create request omits one
    pub default_tax_rate: Decimal,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("QD_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("quotes.default_validity_days", 30)?
            .set_default("quotes.default_currency", shared::DEFAULT_CURRENCY)?
            .set_default("quotes.default_tax_rate", "0")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (QD_ prefix)
            .add_source(
                Environment::with_prefix("QD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            default_validity_days: 30,
            default_currency: shared::DEFAULT_CURRENCY.to_string(),
            default_tax_rate: Decimal::ZERO,
        }
    }
}
