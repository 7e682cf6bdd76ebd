//! Logging configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Env: RG_LOG_LEVEL
    /// Default: "info"
    pub level: String,

    /// "text" or "json"
    /// Env: RG_LOG_FORMAT
    /// Default: "text"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "text".to_string() }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("RG_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = lookup("RG_LOG_FORMAT") {
            self.format = format;
        }
    }

    /// Parsed level filter
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        match self.level.parse() {
            Ok(level) => Ok(level),
            Err(_) => bail!("Invalid log level: {}", self.level),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.level_filter()?;
        if !["text", "json"].contains(&self.format.as_str()) {
            bail!("Invalid log format: must be text or json");
        }
        Ok(())
    }
}
