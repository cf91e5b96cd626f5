use chrono::Duration;
use std::{env, fmt::Display, path::PathBuf, str::FromStr};
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DATA_PATH: &str = "data/state.json";
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;
pub const DEFAULT_API_URL: &str = "http://localhost:3001";

/// Backend settings, read once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub token_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let ttl_days: i64 = try_load("TOKEN_TTL_DAYS", DEFAULT_TOKEN_TTL_DAYS);
        Self {
            port: try_load("PORT", DEFAULT_PORT),
            data_path: resolve_data_path(),
            token_ttl: token_ttl(ttl_days),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            token_ttl: Duration::days(DEFAULT_TOKEN_TTL_DAYS),
        }
    }
}

/// Where the client finds the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_env() -> Self {
        match env::var("BP_API_URL") {
            Ok(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => {
                info!("BP_API_URL not set, using default: {DEFAULT_API_URL}");
                Self::new(DEFAULT_API_URL)
            }
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// Token lifetime in days, kept within `1..=MAX_TOKEN_TTL_DAYS`.
pub fn token_ttl(days: i64) -> Duration {
    let clamped = days.clamp(1, MAX_TOKEN_TTL_DAYS);
    if clamped != days {
        warn!("TOKEN_TTL_DAYS {days} out of range, using {clamped}");
    }
    Duration::days(clamped)
}

pub fn resolve_data_path() -> PathBuf {
    if let Ok(path) = env::var("APP_DATA_PATH") {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_DATA_PATH)
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|err| {
            warn!("Invalid {key} value {raw:?}: {err}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
