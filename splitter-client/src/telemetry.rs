//! Tracing setup for the `splitter-sync` binary.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "splitter_client=info,warn";

/// Install the global subscriber: JSON lines, filtered by `RUST_LOG`, else
/// the configured `log_filter`, else [`DEFAULT_LOG_FILTER`].
pub fn init_tracing(config: &ClientConfig) -> ClientResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_filter(config)))
        .map_err(|e| ClientError::Telemetry(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| ClientError::Telemetry(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        api_base_url = %config.api_base_url,
        ws_base_url = %config.ws_base_url,
        "Telemetry initialized"
    );
    Ok(())
}

fn fallback_filter(config: &ClientConfig) -> &str {
    config
        .log_filter
        .as_deref()
        .filter(|filter| !filter.trim().is_empty())
        .unwrap_or(DEFAULT_LOG_FILTER)
}
