//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::analyser::dialect::DialectDescriptor;
use std::net::Ipv4Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: Ipv4Addr,
    pub port: u16,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::new(0, 0, 0, 0), // Bind to 0.0.0.0 for Docker
            port: 3000,
            request_timeout_secs: 120,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection opened at start-up, if any
    pub url: Option<String>,
    pub max_pool_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_pool_size: 4,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3001".to_string()],
        }
    }
}

/// Analyser tuning
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// Catalog queries issued concurrently per analysis
    pub query_concurrency: usize,
    /// Dialect used when a connection neither names nor reveals one
    pub default_dialect: String,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            query_concurrency: 4,
            default_dialect: "postgres".to_string(),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub analyser: AnalyserConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();

        let server = ServerConfig {
            host: parse_or(&lookup, "HOST", defaults.server.host)?,
            port: parse_or(&lookup, "PORT", defaults.server.port)?,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", defaults.server.request_timeout_secs)?,
        };

        let url = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty());
        if let Some(url) = &url {
            url::Url::parse(url).map_err(|_| {
                ConfigError::InvalidValue("Invalid DATABASE_URL format (expected postgresql://...)".to_string())
            })?;
        }
        let database = DatabaseConfig {
            url,
            max_pool_size: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.database.max_pool_size)?,
        };

        let cors = CorsConfig {
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors.allowed_origins),
        };

        let default_dialect = lookup("ANALYSER_DEFAULT_DIALECT")
            .map(|d| d.trim().to_lowercase())
            .unwrap_or(defaults.analyser.default_dialect);
        if DialectDescriptor::by_name(&default_dialect).is_none() {
            return Err(ConfigError::InvalidValue(format!(
                "ANALYSER_DEFAULT_DIALECT '{}' is not one of postgres, cockroach, redshift",
                default_dialect
            )));
        }

        let query_concurrency: usize =
            parse_or(&lookup, "ANALYSER_QUERY_CONCURRENCY", defaults.analyser.query_concurrency)?;
        if query_concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "ANALYSER_QUERY_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            server,
            database,
            cors,
            analyser: AnalyserConfig {
                query_concurrency,
                default_dialect,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{} has an invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}
