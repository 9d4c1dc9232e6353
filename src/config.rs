use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::telemetry::LogFormat;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HMAC_SECRET: &str = "supersecret-dev";
pub const DEFAULT_SIG_MAX_AGE_SECONDS: i64 = 300;
pub const DEFAULT_SQLITE_DSN: &str = "./app.db";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

/// Process configuration. Built once at startup and handed to the components
/// that need it; nothing reads the environment after this.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server_port: u16,
    pub hmac_secret: String,
    /// Zero or negative disables the freshness check.
    pub sig_max_age_seconds: i64,
    pub sqlite_dsn: String,
    pub cors_allowed_origins: Vec<String>,
    pub strict_status_transitions: bool,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            hmac_secret: DEFAULT_HMAC_SECRET.to_string(),
            sig_max_age_seconds: DEFAULT_SIG_MAX_AGE_SECONDS,
            sqlite_dsn: DEFAULT_SQLITE_DSN.to_string(),
            cors_allowed_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
            strict_status_transitions: false,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let server_port = match get("APP_PORT") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("APP_PORT must be a port number, got {:?}", v))?,
            None => defaults.server_port,
        };

        let sig_max_age_seconds = match get("SIG_MAX_AGE_SECONDS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("SIG_MAX_AGE_SECONDS must be an integer, got {:?}", v))?,
            None => defaults.sig_max_age_seconds,
        };

        let strict_status_transitions = match get("STRICT_STATUS_TRANSITIONS") {
            Some(v) => parse_bool(&v).with_context(|| {
                format!("STRICT_STATUS_TRANSITIONS must be true or false, got {:?}", v)
            })?,
            None => defaults.strict_status_transitions,
        };

        let cors_allowed_origins = match get("CORS_ALLOWED_ORIGINS") {
            Some(v) => parse_origins(&v)?,
            None => defaults.cors_allowed_origins,
        };

        Ok(Config {
            server_port,
            hmac_secret: get("HMAC_SECRET").unwrap_or(defaults.hmac_secret),
            sig_max_age_seconds,
            sqlite_dsn: get("SQLITE_DSN").unwrap_or(defaults.sqlite_dsn),
            cors_allowed_origins,
            strict_status_transitions,
            log_format: get("LOG_FORMAT")
                .map(|v| LogFormat::from_str_lossy(&v))
                .unwrap_or(defaults.log_format),
        })
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("not a boolean"),
    }
}

fn parse_origins(raw: &str) -> Result<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        anyhow::bail!("CORS_ALLOWED_ORIGINS must be a comma-separated list of origins");
    }

    Ok(origins)
}
