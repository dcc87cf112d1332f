use crate::error::{AppError, Result};

pub const DB_PATH: &str = "auction.db";
pub const API_PORT: u16 = 3001;

/// Country whose players are not overseas.
pub const HOME_COUNTRY: &str = "India";

/// Pool size. SQLite serializes writers regardless; extra connections serve pollers.
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits for the database lock before failing with a storage error.
pub const DB_BUSY_TIMEOUT_SECS: u64 = 5;

/// Squad limits applied when a team is created without explicit values.
pub mod squad_defaults {
    pub const MAX_SQUAD_SIZE: i64 = 25;
    pub const MIN_SQUAD_SIZE: i64 = 11;
    pub const MAX_OVERSEAS: i64 = 8;
}

/// Default page sizes for the read feeds.
pub const HISTORY_LIMIT: i64 = 10;
pub const RECENTLY_SOLD_LIMIT: i64 = 5;

/// Maximum short_code length.
pub const SHORT_CODE_MAX_LEN: usize = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    pub db_max_connections: u32,
    /// Players from any other country are overseas (HOME_COUNTRY)
    pub home_country: String,
    /// Allowed dashboard origins (CORS_ORIGINS, comma-separated). Empty allows any origin.
    pub cors_origins: Vec<String>,
    pub default_max_squad: i64,
    pub default_min_squad: i64,
    pub default_max_overseas: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| DB_PATH.to_string()),
            api_port: parse_var("API_PORT", API_PORT)?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS)?,
            home_country: std::env::var("HOME_COUNTRY")
                .unwrap_or_else(|_| HOME_COUNTRY.to_string()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            default_max_squad: parse_var("DEFAULT_MAX_SQUAD", squad_defaults::MAX_SQUAD_SIZE)?,
            default_min_squad: parse_var("DEFAULT_MIN_SQUAD", squad_defaults::MIN_SQUAD_SIZE)?,
            default_max_overseas: parse_var("DEFAULT_MAX_OVERSEAS", squad_defaults::MAX_OVERSEAS)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            db_path: DB_PATH.to_string(),
            api_port: API_PORT,
            db_max_connections: DB_MAX_CONNECTIONS,
            home_country: HOME_COUNTRY.to_string(),
            cors_origins: Vec::new(),
            default_max_squad: squad_defaults::MAX_SQUAD_SIZE,
            default_min_squad: squad_defaults::MIN_SQUAD_SIZE,
            default_max_overseas: squad_defaults::MAX_OVERSEAS,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{name} must be a valid number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}
