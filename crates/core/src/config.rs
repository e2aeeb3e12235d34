//! Service configuration
//!
//! Loaded from a TOML file; secrets may instead come from the environment
//! (`NOTIFIER_SECRET`, `NOTIFIER_MATRIX_TOKEN`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::rules::RuleTable;

pub const SECRET_ENV: &str = "NOTIFIER_SECRET";
pub const MATRIX_TOKEN_ENV: &str = "NOTIFIER_MATRIX_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub matrix: MatrixConfig,
    #[serde(default)]
    pub mailer: MailerConfig,
    /// Overrides of the default rule table
    #[serde(default)]
    pub rules: RuleTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Key for invite capability tokens
    #[serde(default)]
    pub secret: String,
    /// Base URL used in invite links
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            public_url: default_public_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Homeserver base URL
    pub homeserver: String,
    /// Service account token used for membership lookups
    #[serde(default)]
    pub access_token: String,
    /// Upper bound on every homeserver request
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Delay before the single retry of an unreachable homeserver; 0 disables it
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl MatrixConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Option<Duration> {
        (self.retry_backoff_ms > 0).then(|| Duration::from_millis(self.retry_backoff_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_subject")]
    pub subject: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            subject: default_subject(),
        }
    }
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("notifier.db")
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_from() -> String {
    "noreply@localhost".to_string()
}

fn default_subject() -> String {
    "You have been invited".to_string()
}

impl Config {
    /// Load, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::InvalidConfig(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse without overrides or validation
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace secrets with values from `lookup` when set and non-empty
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(SECRET_ENV).filter(|s| !s.is_empty()) {
            self.server.secret = secret;
        }
        if let Some(token) = lookup(MATRIX_TOKEN_ENV).filter(|s| !s.is_empty()) {
            self.matrix.access_token = token;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.secret.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "server.secret is empty (set it or {})",
                SECRET_ENV
            )));
        }
        if self.matrix.homeserver.trim().is_empty() {
            return Err(Error::InvalidConfig("matrix.homeserver is empty".into()));
        }
        if self.matrix.timeout_ms == 0 {
            return Err(Error::InvalidConfig("matrix.timeout_ms must be positive".into()));
        }
        Ok(())
    }
}
