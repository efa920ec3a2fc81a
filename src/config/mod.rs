//! Configuration management for sharebox
//!
//! Settings are layered from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use sharebox::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("App group root: {}", config.relay.groups_root.display());
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `SHAREBOX__<section>__<key>`:
//! - `SHAREBOX__APP__BUNDLE_ID=com.example.notes`
//! - `SHAREBOX__RELAY__GROUPS_ROOT=/var/lib/sharebox`
//! - `SHAREBOX__LOGGING__VERBOSITY=debug`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/sharebox.toml`.
//! This can be overridden using the `SHAREBOX_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{AppConfig, Config, ExtractConfig, LoggingConfig, RelayConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(&config_path, "[app]\nbundle_id = \"com.example.notes\"\n").unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.app.bundle_id, "com.example.notes");
        assert_eq!(config.relay.content_type_key, "SharedContentType");
    }

    #[test]
    fn test_validation_catches_bad_mime() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[app]
bundle_id = "com.example.notes"

[extract.extra_types]
md = "markdown"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::InvalidExtraType { .. })
        ));
    }

    #[test]
    fn test_missing_bundle_id_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "[logging]\nverbosity = \"debug\"\n").unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(ValidationError::MissingBundleId)
        ));
    }
}
