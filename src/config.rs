//! Runtime settings: compiled-in defaults, overridden by `ADDRESS_*`
//! environment variables, overridden in turn by CLI flags in the binaries.

use crate::db::{CITY_BATCH_SIZE, STREET_BATCH_SIZE};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub cities_path: PathBuf,
    pub streets_path: PathBuf,
    pub cache_path: PathBuf,
    pub city_batch_size: usize,
    pub street_batch_size: usize,
    pub bind_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/addresses.db"),
            cities_path: PathBuf::from("data/cities.json"),
            streets_path: PathBuf::from("data/streets.json"),
            cache_path: PathBuf::from("data/cities_cache.json"),
            city_batch_size: CITY_BATCH_SIZE,
            street_batch_size: STREET_BATCH_SIZE,
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: env_path("ADDRESS_DB_PATH", defaults.db_path),
            cities_path: env_path("ADDRESS_CITIES_PATH", defaults.cities_path),
            streets_path: env_path("ADDRESS_STREETS_PATH", defaults.streets_path),
            cache_path: env_path("ADDRESS_CACHE_PATH", defaults.cache_path),
            city_batch_size: env_parse_with_default("ADDRESS_CITY_BATCH", defaults.city_batch_size),
            street_batch_size: env_parse_with_default("ADDRESS_STREET_BATCH", defaults.street_batch_size),
            bind_addr: std::env::var("ADDRESS_BIND").unwrap_or(defaults.bind_addr),
        }
    }
}

fn env_path(var: &str, default: PathBuf) -> PathBuf {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or(default)
}

/// Parse an environment variable, falling back to `default`.
///
/// Unset is the expected case and stays silent; a value that doesn't parse
/// logs a warning before falling back.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(var: &str, default: T) -> T {
    match std::env::var(var) {
        Ok(v) => match v.parse() {
            Ok(n) => n,
            Err(_) => {
                tracing::warn!(var, value = %v, default = %default, "invalid env var value, using default");
                default
            }
        },
        Err(_) => default,
    }
}
