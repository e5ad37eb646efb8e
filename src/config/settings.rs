//! Process settings from the environment (after `dotenvy::dotenv()`).

use crate::error::ConfigError;
use crate::service::PaginationSettings;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub pagination: PaginationSettings,
    /// JSON file of resource declarations, if resources are not declared in code.
    pub resources_path: Option<PathBuf>,
}

impl Settings {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/supine".into());
        let bind_addr = lookup("SUPINE_BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8000".into());
        let max_connections = parse_or(&lookup, "SUPINE_MAX_CONNECTIONS", 5u32)?;
        let default_count = parse_or(&lookup, "SUPINE_DEFAULT_PAGE_SIZE", PaginationSettings::default().default_count)?;
        let max_count = parse_or(&lookup, "SUPINE_MAX_PAGE_SIZE", PaginationSettings::default().max_count)?;
        let pagination = PaginationSettings::new(default_count, max_count)?;
        let resources_path = lookup("SUPINE_RESOURCES").filter(|s| !s.is_empty()).map(PathBuf::from);
        Ok(Settings {
            database_url,
            bind_addr,
            max_connections,
            pagination,
            resources_path,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Settings(format!("{} must be a number, got '{}'", key, raw))),
    }
}
