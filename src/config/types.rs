//! Raw config types matching the TOML layout.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// What to do when a mutating statement does not affect exactly one row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// Log a warning and report success.
    #[default]
    Warn,
    /// Fail with `AppError::AffectedRows`.
    Strict,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 9000,
            body_limit: 2 * 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection URL. When set, the discrete connection fields are ignored.
    pub url: Option<String>,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub db: String,
    pub charset: String,
    pub min_size: u32,
    pub max_size: u32,
    pub write_policy: WritePolicy,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: None,
            scheme: "mysql".into(),
            host: "localhost".into(),
            port: 3306,
            user: "www-data".into(),
            password: String::new(),
            db: "awesome".into(),
            charset: "utf8".into(),
            min_size: 1,
            max_size: 10,
            write_policy: WritePolicy::Warn,
        }
    }
}

impl DatabaseConfig {
    /// Connection URL: `url` verbatim, else assembled from the discrete fields.
    pub fn connect_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }
        let base = format!("{}://{}:{}/{}", self.scheme, self.host, self.port, self.db);
        let mut url = url::Url::parse(&base).map_err(|e| ConfigError::DatabaseUrl(format!("{}: {}", base, e)))?;
        url.set_username(&self.user)
            .map_err(|_| ConfigError::DatabaseUrl(format!("cannot set user on {}", base)))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| ConfigError::DatabaseUrl(format!("cannot set password on {}", base)))?;
        }
        if matches!(self.scheme.as_str(), "mysql" | "mariadb") && !self.charset.is_empty() {
            url.query_pairs_mut().append_pair("charset", &self.charset);
        }
        Ok(url.to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError::Validation("database.max_size must be at least 1".into()));
        }
        if self.min_size > self.max_size {
            return Err(ConfigError::Validation(format!(
                "database.min_size ({}) exceeds max_size ({})",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub path: String,
    pub autoescape: bool,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        TemplateConfig {
            path: "templates".into(),
            autoescape: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub debug: bool,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub templates: TemplateConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            debug: true,
            log_filter: "webstrate=info,tower_http=info".into(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            templates: TemplateConfig::default(),
        }
    }
}
