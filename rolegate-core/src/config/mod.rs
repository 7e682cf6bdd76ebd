//! Configuration system for Rolegate
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (builder methods on the components)
//! 2. **Environment Variables** (`RG_*`)
//! 3. **Config File** (`rolegate.toml`)
//! 4. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use rolegate_core::config::RolegateConfig;
//!
//! let config = RolegateConfig::load()?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! A config file only needs the sections it overrides:
//!
//! ```toml
//! [client]
//! base_url = "https://admin.example.com/api"
//! timeout_secs = 10
//!
//! [matrix]
//! busy_policy = "reject"
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

pub mod client;
pub mod logging;
pub mod matrix;

pub use client::ClientConfig;
pub use logging::LoggingConfig;
pub use matrix::{BusyPolicy, MatrixConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "rolegate.toml";

/// Complete Rolegate configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolegateConfig {
    pub client: ClientConfig,
    pub matrix: MatrixConfig,
    pub logging: LoggingConfig,
}

impl RolegateConfig {
    /// Load configuration with full supersedence chain
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file, then apply the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.client.merge(other.client);
        self.matrix.merge(other.matrix);
        self.logging.merge(other.logging);
    }

    /// Apply `RG_*` environment variables
    pub fn apply_env_vars(&mut self) {
        self.apply_vars(|key| env::var(key).ok());
    }

    /// Apply variables from an arbitrary lookup (environment, test maps)
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.client.apply_vars(&lookup);
        self.matrix.apply_vars(&lookup);
        self.logging.apply_vars(&lookup);
    }

    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.matrix.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RolegateConfig::default();
        assert_eq!(config.client.base_url, "http://127.0.0.1:8080/api");
        assert_eq!(config.client.timeout_secs, 30);
        assert!(config.matrix.load_on_start);
        assert_eq!(config.matrix.busy_policy, BusyPolicy::Queue);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nbase_url = \"https://admin.example.com/api\"").unwrap();
        writeln!(file, "[matrix]\nbusy_policy = \"reject\"").unwrap();

        let config = RolegateConfig::from_file(file.path()).unwrap();
        assert_eq!(config.client.base_url, "https://admin.example.com/api");
        assert_eq!(config.client.timeout_secs, 30);
        assert_eq!(config.matrix.busy_policy, BusyPolicy::Reject);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RolegateConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.matrix, MatrixConfig::default());
    }

    #[test]
    fn test_variables_override_file() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("RG_API_BASE_URL", "http://10.0.0.5/api"),
            ("RG_API_TOKEN", "secret"),
            ("RG_API_TIMEOUT_SECS", "7"),
            ("RG_MATRIX_BUSY_POLICY", "reject"),
            ("RG_LOG_LEVEL", "debug"),
        ]);

        let mut config = RolegateConfig::default();
        config.apply_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.client.base_url, "http://10.0.0.5/api");
        assert_eq!(config.client.token.as_deref(), Some("secret"));
        assert_eq!(config.client.timeout_secs, 7);
        assert_eq!(config.matrix.busy_policy, BusyPolicy::Reject);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = RolegateConfig::default();
        config.client.base_url = "ftp://nope".to_string();
        assert!(config.validate().is_err());

        let mut config = RolegateConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = RolegateConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
