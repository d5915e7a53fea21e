// bazaar/server/src/config.rs

use crate::errors::{AppError, Result};
use bazaar::StatusPolicy;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Log line format of the binary's subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
  #[default]
  Pretty,
  Json,
}

impl FromStr for LogFormat {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "pretty" => Ok(LogFormat::Pretty),
      "json" => Ok(LogFormat::Json),
      other => Err(AppError::Config(format!("Invalid LOG_FORMAT: {}", other))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  // None selects the in-memory backend.
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub seed_db: bool,
  pub status_policy: StatusPolicy,
  pub token_ttl_hours: i64,
  pub log_format: LogFormat,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: None,
      database_max_connections: 5,
      seed_db: false,
      status_policy: StatusPolicy::default(),
      token_ttl_hours: 168,
      log_format: LogFormat::Pretty,
    }
  }
}

impl AppConfig {
  /// Reads the configuration from the process environment, after loading a
  /// `.env` file if one is present.
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Builds the configuration from an arbitrary key lookup. Unset keys take
  /// their defaults; set but unparsable keys are a `Config` error.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let defaults = Self::default();
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let server_host = get("SERVER_HOST").unwrap_or(defaults.server_host);
    let server_port = parse_or(get("SERVER_PORT"), "SERVER_PORT", defaults.server_port)?;
    let database_url = get("DATABASE_URL");
    let database_max_connections = parse_or(
      get("DATABASE_MAX_CONNECTIONS"),
      "DATABASE_MAX_CONNECTIONS",
      defaults.database_max_connections,
    )?;
    let seed_db = parse_or(get("SEED_DB"), "SEED_DB", defaults.seed_db)?;
    let status_policy = match get("ORDER_STATUS_POLICY") {
      Some(raw) => raw
        .parse::<StatusPolicy>()
        .map_err(|e| AppError::Config(format!("Invalid ORDER_STATUS_POLICY: {}", e)))?,
      None => defaults.status_policy,
    };
    let token_ttl_hours = parse_or(get("TOKEN_TTL_HOURS"), "TOKEN_TTL_HOURS", defaults.token_ttl_hours)?;
    if token_ttl_hours <= 0 || chrono::Duration::try_hours(token_ttl_hours).is_none() {
      return Err(AppError::Config("TOKEN_TTL_HOURS must be a positive number of hours".to_string()));
    }
    let log_format = match get("LOG_FORMAT") {
      Some(raw) => raw.parse::<LogFormat>()?,
      None => defaults.log_format,
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      seed_db,
      status_policy,
      token_ttl_hours,
      log_format,
    })
  }

  pub fn backend_name(&self) -> &'static str {
    if self.database_url.is_some() {
      "postgres"
    } else {
      "memory"
    }
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match raw {
    Some(value) => value
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
    None => Ok(default),
  }
}
