use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing env var: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub trials_api_url: String,
    pub trials_api_key: Option<String>,
    pub trials_timeout: Duration,
    pub public_site_url: String,
}

pub fn load_env() {
    if dotenv().is_ok() {
        tracing::debug!("loaded .env file");
    }
}

pub fn get_env(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = env_or(key, default);
    value
        .parse::<T>()
        .map_err(|_| ConfigError::Invalid { key, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let trials_api_key = env::var("TRIALS_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok(Config {
            database_url: get_env("DATABASE_URL")?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", "5")?,
            bind_addr: parse_env("BIND_ADDR", "0.0.0.0:8080")?,
            jwt_secret: get_env("AUTH_JWT_SECRET")?,
            jwt_audience: env_or("AUTH_JWT_AUDIENCE", "authenticated"),
            trials_api_url: env_or("TRIALS_API_URL", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
            trials_api_key,
            trials_timeout: Duration::from_secs(parse_env("TRIALS_TIMEOUT_SECS", "15")?),
            public_site_url: env_or("PUBLIC_SITE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
        })
    }
}
