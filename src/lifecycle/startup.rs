//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Bind the listener; failure here is the one fatal runtime condition

use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::backend::BackendError;
use crate::config::{self, ConfigError, GatewayConfig};

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Load configuration from `path` when given, else from defaults; env overrides apply either way.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, StartupError> {
    let config = match path {
        Some(path) => config::load_config(path)?,
        None => config::load_default()?,
    };
    Ok(config)
}

/// Bind the listener on the configured address.
pub async fn bind(config: &GatewayConfig) -> Result<TcpListener, StartupError> {
    let address = config.listener.bind_address.clone();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_conflict_is_fatal_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = GatewayConfig::default();
        config.listener.bind_address = taken.local_addr().unwrap().to_string();

        let err = bind(&config).await.unwrap_err();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
