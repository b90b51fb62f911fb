//! Top-level error for the `splitter-sync` binary.

use crate::api_client::ApiClientError;
use crate::config::ConfigError;
use crate::persistence::PersistenceError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("API error: {0}")]
    Api(#[from] ApiClientError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

pub type ClientResult<T> = Result<T, ClientError>;
