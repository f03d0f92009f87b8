//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `backend.base_url`.
pub const ENV_BACKEND_URL: &str = "RAG_BACKEND_URL";
/// Environment variable overriding `listener.bind_address`.
pub const ENV_BIND_ADDRESS: &str = "GATEWAY_BIND_ADDRESS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, applying env overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: GatewayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;
    finish(config)
}

/// Build the configuration without a file: defaults plus env overrides.
pub fn load_default() -> Result<GatewayConfig, ConfigError> {
    finish(GatewayConfig::default())
}

fn finish(mut config: GatewayConfig) -> Result<GatewayConfig, ConfigError> {
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply overrides from a variable lookup; empty values are ignored.
pub fn apply_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = lookup(ENV_BACKEND_URL) {
        config.backend.base_url = url;
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[backend]\nbase_url = \"http://10.0.0.5:8000\"\n\n[timeouts]\nupload_secs = 120"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.timeouts.upload_secs, 120);
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn test_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend\nbase_url = 1").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmax_upload_bytes = 0").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_upload_bytes"));
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmax_upload_bytes = 0\n\n[timeouts]\nrequest_secs = 0").unwrap();
        let err = load_config(file.path()).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("max_upload_bytes"));
        assert!(message.contains(", "));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(std::error::Error::source(&err).is_some());
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_overrides() {
        let mut config = GatewayConfig::default();
        apply_overrides(&mut config, |key| match key {
            ENV_BACKEND_URL => Some("http://rag.internal:8000".into()),
            ENV_BIND_ADDRESS => Some("   ".into()),
            _ => None,
        });
        assert_eq!(config.backend.base_url, "http://rag.internal:8000");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8082");
    }
}
