//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use sqlx::postgres::PgConnectOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Connection parameters for the record store.
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// Full connection URL. When set, it takes precedence over the discrete parameters.
    pub url: Option<String>,
    pub host: String,
    pub name: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Builds the sqlx connection options.
    pub fn connect_options(&self) -> Result<PgConnectOptions, ConfigError> {
        match &self.url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| ConfigError::InvalidValue("DATABASE_URL".to_string(), e.to_string())),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.name)),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database: DatabaseConfig,
    pub log_level: Level,
    pub llama_cloud_api_key: Option<String>,
    pub llama_cloud_base_url: String,
    pub extraction_agent_name: String,
    pub extraction_timeout: Duration,
    pub extraction_poll_interval: Duration,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// `None` allows any origin.
    pub cors_allowed_origin: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server Settings ---
        let bind_address = parse_var("BIND_ADDRESS", var_or("BIND_ADDRESS", "0.0.0.0:5000"))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Database Settings ---
        let database = DatabaseConfig {
            url: lookup("DATABASE_URL"),
            host: var_or("DB_HOST", "localhost"),
            name: var_or("DB_NAME", "doc_parser"),
            user: var_or("DB_USER", "postgres"),
            password: var_or("DB_PASSWORD", "password"),
            port: parse_var("DB_PORT", var_or("DB_PORT", "5432"))?,
            max_connections: parse_var("DB_MAX_CONNECTIONS", var_or("DB_MAX_CONNECTIONS", "5"))?,
        };

        // --- Load Extraction Settings ---
        let llama_cloud_api_key = lookup("LLAMA_CLOUD_API_KEY").filter(|k| !k.trim().is_empty());
        let llama_cloud_base_url = var_or("LLAMA_CLOUD_BASE_URL", "https://api.cloud.llamaindex.ai")
            .trim_end_matches('/')
            .to_string();
        let extraction_agent_name = var_or("EXTRACTION_AGENT_NAME", "document-parser-app");
        let extraction_timeout = Duration::from_secs(parse_var(
            "EXTRACTION_TIMEOUT_SECS",
            var_or("EXTRACTION_TIMEOUT_SECS", "120"),
        )?);
        let extraction_poll_interval = Duration::from_millis(parse_var(
            "EXTRACTION_POLL_INTERVAL_MS",
            var_or("EXTRACTION_POLL_INTERVAL_MS", "2000"),
        )?);

        // --- Load Upload Settings ---
        let upload_dir = PathBuf::from(var_or("UPLOAD_DIR", "uploads"));
        let max_upload_bytes =
            parse_var("MAX_UPLOAD_BYTES", var_or("MAX_UPLOAD_BYTES", "16777216"))?;
        let cors_allowed_origin = lookup("CORS_ALLOWED_ORIGIN").filter(|o| !o.trim().is_empty());

        Ok(Self {
            bind_address,
            database,
            log_level,
            llama_cloud_api_key,
            llama_cloud_base_url,
            extraction_agent_name,
            extraction_timeout,
            extraction_poll_interval,
            upload_dir,
            max_upload_bytes,
            cors_allowed_origin,
        })
    }
}

fn parse_var<T>(key: &str, raw: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
