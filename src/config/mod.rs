//! TOML-based configuration for the graph service.
//!
//! Example configuration:
//! ```toml
//! [server]
//! listen = "0.0.0.0:8080"
//! request_timeout_secs = 30
//!
//! [clickhouse]
//! host = "clickhouse.internal"
//! port = 8123
//! username = "monitor_ro"
//! password = "${CLICKHOUSE_MONITOR_PASSWORD}"
//!
//! [auth.tokens]
//! "3f1c9a..." = "alice"
//! ```

use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use crate::db_types::ConnectionConfig;

const DEFAULT_CONFIG_FILE: &str = "chgraph.toml";

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub clickhouse: ClickHouseSettings,
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: String,
    pub request_timeout_secs: u64,
    pub cors_allow_any: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            cors_allow_any: true,
        }
    }
}

/// Privileged read-only service account used for catalog reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClickHouseSettings {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub secure: bool,
}

impl Default for ClickHouseSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: 8123,
            username: None,
            password: None,
            database: None,
            secure: false,
        }
    }
}

impl ClickHouseSettings {
    /// Resolve the connection parameters, expanding `${VAR}` references.
    ///
    /// Returns `Ok(None)` when host or username is missing, which the request
    /// path reports as a configuration error.
    pub fn connection_config(&self) -> Result<Option<ConnectionConfig>, SettingsError> {
        self.connection_config_with(|name| env::var(name).ok())
    }

    fn connection_config_with<F>(&self, lookup: F) -> Result<Option<ConnectionConfig>, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expand = |value: &Option<String>| -> Result<Option<String>, SettingsError> {
            value
                .as_deref()
                .map(|raw| expand_env_vars_with(raw, &lookup))
                .transpose()
                .map(|resolved| resolved.filter(|v| !v.trim().is_empty()))
        };

        let (Some(host), Some(username)) = (expand(&self.host)?, expand(&self.username)?) else {
            return Ok(None);
        };

        Ok(Some(ConnectionConfig {
            host,
            port: self.port,
            username,
            password: expand(&self.password)?,
            database: expand(&self.database)?,
            secure: self.secure,
        }))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthSettings {
    /// Session token -> user name.
    pub tokens: HashMap<String, String>,
    pub allow_anonymous: bool,
}

impl Settings {
    pub fn parse(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SettingsError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load settings from an explicit path, `CHGRAPH_CONFIG`, or `./chgraph.toml`
    /// (in that order), then apply environment overrides. No file means defaults.
    pub fn load(explicit_path: Option<PathBuf>) -> Result<Self, SettingsError> {
        let path = explicit_path
            .or_else(|| env::var("CHGRAPH_CONFIG").ok().map(PathBuf::from))
            .or_else(|| {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            });

        let mut settings = match path {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => {
                log::info!("No configuration file found, using defaults");
                Settings::default()
            }
        };

        settings.apply_env_overrides(|name| env::var(name).ok())?;
        Ok(settings)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("CLICKHOUSE_HOST") {
            self.clickhouse.host = Some(host);
        }
        if let Some(port) = lookup("CLICKHOUSE_PORT") {
            self.clickhouse.port = port.trim().parse().map_err(|_| {
                SettingsError::InvalidConfig(format!("CLICKHOUSE_PORT is not a valid port: {}", port))
            })?;
        }
        if let Some(user) = lookup("CLICKHOUSE_USER") {
            self.clickhouse.username = Some(user);
        }
        if let Some(password) = lookup("CLICKHOUSE_PASSWORD") {
            self.clickhouse.password = Some(password);
        }
        if let Some(listen) = lookup("CHGRAPH_LISTEN") {
            self.server.listen = listen;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs.max(1))
    }
}

fn expand_env_vars_with<F>(value: &str, lookup: F) -> Result<String, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = None;
    let expanded = ENV_VAR_PATTERN.replace_all(value, |caps: &Captures| {
        let name = &caps[1];
        lookup(name).unwrap_or_else(|| {
            missing.get_or_insert_with(|| name.to_string());
            String::new()
        })
    });

    match missing {
        Some(name) => Err(SettingsError::MissingEnvVar(name)),
        None => Ok(expanded.into_owned()),
    }
}
