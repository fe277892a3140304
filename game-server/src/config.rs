use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use game_persistence::connection::DEFAULT_DATABASE_URL;
use game_persistence::{PersistBackend, StoreSettings};

pub const DEFAULT_SECRET_KEY: &str = "change-me-in-production";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub secret_key: String,
    pub backend: PersistBackend,
    pub database_url: String,
    pub json_path: PathBuf,
    pub leaderboard_size: usize,
    pub session_timeout_minutes: u64,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source, falling back to defaults
    /// for absent keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: parse("HOST", get("HOST", "127.0.0.1"))?,
            port: parse("PORT", get("PORT", "5000"))?,
            secret_key: get("SECRET_KEY", DEFAULT_SECRET_KEY),
            backend: parse("PERSIST_BACKEND", get("PERSIST_BACKEND", "sqlite"))?,
            database_url: get("DATABASE_URL", DEFAULT_DATABASE_URL),
            json_path: PathBuf::from(get("JSON_PATH", "web_leaderboard.json")),
            leaderboard_size: parse("LEADERBOARD_SIZE", get("LEADERBOARD_SIZE", "10"))?,
            session_timeout_minutes: parse(
                "SESSION_TIMEOUT_MINUTES",
                get("SESSION_TIMEOUT_MINUTES", "120"),
            )?,
        })
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            backend: self.backend,
            database_url: self.database_url.clone(),
            json_path: self.json_path.clone(),
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes * 60)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}
