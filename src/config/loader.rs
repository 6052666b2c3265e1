//! Load config from a TOML defaults file, an optional override file and the environment.

use crate::config::AppConfig;
use crate::error::ConfigError;
use std::path::Path;
use toml::{Table, Value};

/// Merge `overrides` into `defaults`. Nested tables merge key by key; any other value in
/// `overrides` replaces the default outright.
pub fn merge(mut defaults: Table, overrides: Table) -> Table {
    for (key, value) in overrides {
        match (defaults.remove(&key), value) {
            (Some(Value::Table(base)), Value::Table(over)) => {
                defaults.insert(key, Value::Table(merge(base, over)));
            }
            (_, value) => {
                defaults.insert(key, value);
            }
        }
    }
    defaults
}

/// Parse defaults and optional overrides from TOML source text.
pub fn from_toml_str(defaults: &str, overrides: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base: Table = toml::from_str(defaults)?;
    let merged = match overrides {
        Some(src) => merge(base, toml::from_str(src)?),
        None => base,
    };
    let config: AppConfig = Value::Table(merged).try_into()?;
    config.database.validate()?;
    Ok(config)
}

/// Read the defaults file (required when given) and the override file (skipped when absent),
/// then apply environment overrides.
pub fn load_config(defaults: Option<&Path>, overrides: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let base = match defaults {
        Some(path) => std::fs::read_to_string(path)?,
        None => String::new(),
    };
    let over = match overrides {
        Some(path) if path.exists() => {
            tracing::info!(path = %path.display(), "loading config overrides");
            Some(std::fs::read_to_string(path)?)
        }
        _ => None,
    };
    let config = from_toml_str(&base, over.as_deref())?;
    Ok(apply_env(config))
}

/// `.env` plus `DATABASE_URL`, `APP_HOST` and `APP_PORT`.
pub fn apply_env(mut config: AppConfig) -> AppConfig {
    dotenvy::dotenv().ok();
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = Some(url);
    }
    if let Ok(host) = std::env::var("APP_HOST") {
        config.server.host = host;
    }
    if let Some(port) = std::env::var("APP_PORT").ok().and_then(|p| p.parse().ok()) {
        config.server.port = port;
    }
    config
}
