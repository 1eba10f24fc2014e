//! Configuration loading and representation.
//!
//! Everything comes from environment variables. The engine is chosen once,
//! here: a `DATABASE_URL` selects PostgreSQL (or SQLite for a `sqlite:` URL),
//! otherwise the embedded SQLite file at `PANTRY_SQLITE_PATH` is used.

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

pub const DEFAULT_SQLITE_PATH: &str = "shopping.db";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_PG_MAX_CONNECTIONS: u32 = 5;

/// Which engine to open, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Sqlite { url: String },
    Postgres { url: String, max_connections: u32 },
}

impl DatabaseConfig {
    pub fn sqlite_file(path: &str) -> Self {
        DatabaseConfig::Sqlite {
            url: format!("sqlite://{path}"),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseConfig,
    pub listen_addr: SocketAddr,
    /// Allowed CORS origins; `["*"]` allows any origin.
    pub cors_allow: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not valid: {message}")]
    Invalid { var: &'static str, message: String },

    #[error("DATABASE_URL has an unsupported scheme: {0}")]
    UnsupportedScheme(String),
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (an environment-like source).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = match var("DATABASE_URL") {
            Some(url) => parse_database_url(url, var("PANTRY_PG_MAX_CONNECTIONS"))?,
            None => DatabaseConfig::sqlite_file(
                &var("PANTRY_SQLITE_PATH").unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string()),
            ),
        };

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                message: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let ip = match var("PANTRY_BIND_ADDR") {
            Some(raw) => raw.trim().parse::<IpAddr>().map_err(|e| ConfigError::Invalid {
                var: "PANTRY_BIND_ADDR",
                message: e.to_string(),
            })?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let cors_allow = var("PANTRY_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database,
            listen_addr: SocketAddr::new(ip, port),
            cors_allow,
        })
    }
}

fn parse_database_url(
    url: String,
    max_connections: Option<String>,
) -> Result<DatabaseConfig, ConfigError> {
    let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
    match scheme.as_str() {
        "postgres" | "postgresql" => {
            let max_connections = match max_connections {
                Some(raw) => raw.trim().parse::<u32>().map_err(|e| ConfigError::Invalid {
                    var: "PANTRY_PG_MAX_CONNECTIONS",
                    message: e.to_string(),
                })?,
                None => DEFAULT_PG_MAX_CONNECTIONS,
            };
            Ok(DatabaseConfig::Postgres {
                url,
                max_connections,
            })
        }
        "sqlite" => Ok(DatabaseConfig::Sqlite { url }),
        _ => Err(ConfigError::UnsupportedScheme(scheme)),
    }
}
