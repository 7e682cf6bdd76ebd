//! Backend client configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// How to reach the permission backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST API
    /// Env: RG_API_BASE_URL
    /// Default: "http://127.0.0.1:8080/api"
    pub base_url: String,

    /// Bearer token sent on every request
    /// Env: RG_API_TOKEN
    /// Default: None
    pub token: Option<String>,

    /// Request timeout in seconds
    /// Env: RG_API_TIMEOUT_SECS
    /// Default: 30
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { base_url: "http://127.0.0.1:8080/api".to_string(), token: None, timeout_secs: 30 }
    }
}

impl ClientConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.base_url = other.base_url;
        if other.token.is_some() {
            self.token = other.token;
        }
        self.timeout_secs = other.timeout_secs;
    }

    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("RG_API_BASE_URL") {
            self.base_url = url;
        }

        if let Some(token) = lookup("RG_API_TOKEN") {
            self.token = if token.is_empty() { None } else { Some(token) };
        }

        if let Some(timeout) = lookup("RG_API_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.timeout_secs = t;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            bail!("Invalid base_url: must start with http:// or https://");
        }

        if self.timeout_secs == 0 {
            bail!("Invalid timeout_secs: must be greater than 0");
        }

        Ok(())
    }
}
