//! Configuration loading for the Splitter client.
//!
//! Every field has a local-development default so the client runs with no
//! config file at all. A TOML file (`--config` or `SPLITTER_CONFIG`) replaces
//! defaults, and `SPLITTER_API_URL` / `SPLITTER_WS_URL` override both.

use crate::persistence::SESSION_NAMESPACE;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_WS_BASE_URL: &str = "ws://localhost:8080";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;

pub const API_URL_ENV: &str = "SPLITTER_API_URL";
pub const WS_URL_ENV: &str = "SPLITTER_WS_URL";
pub const CONFIG_PATH_ENV: &str = "SPLITTER_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub ws_base_url: String,
    pub request_timeout_ms: u64,
    pub reconnect_delay_ms: u64,
    pub cache_ttl_ms: u64,
    pub session_path: PathBuf,
    pub login_route: String,
    pub log_filter: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ws_base_url: DEFAULT_WS_BASE_URL.to_string(),
            request_timeout_ms: 30_000,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            cache_ttl_ms: 60_000,
            session_path: PathBuf::from(".splitter").join(format!("{}.json", SESSION_NAMESPACE)),
            login_route: "/auth/login".to_string(),
            log_filter: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let mut config = match path {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply URL overrides from a variable lookup (the process environment in
    /// production). Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(url) = lookup(WS_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.ws_base_url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("api_base_url", &self.api_base_url, &["http://", "https://"])?;
        validate_url("ws_base_url", &self.ws_base_url, &["ws://", "wss://"])?;
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.reconnect_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "reconnect_delay_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.session_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "session_path",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.login_route.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "login_route",
                reason: "must start with '/'".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    /// Realtime endpoint for the given access token.
    pub fn ws_url(&self, access_token: &str) -> String {
        ws_url(&self.ws_base_url, access_token)
    }
}

pub fn ws_url(ws_base_url: &str, access_token: &str) -> String {
    format!("{}/ws?token={}", ws_base_url.trim_end_matches('/'), access_token)
}

fn validate_url(field: &'static str, value: &str, schemes: &[&str]) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if !schemes.iter().any(|scheme| value.starts_with(scheme)) {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("must start with one of {:?}", schemes),
        });
    }
    Ok(())
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
