//! Matrix store configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// What a toggle does when its cell already has one in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Wait for the running toggle, then apply (FIFO per cell)
    #[default]
    Queue,
    /// Fail immediately with `CellBusy`
    Reject,
}

impl std::str::FromStr for BusyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "queue" => Ok(BusyPolicy::Queue),
            "reject" => Ok(BusyPolicy::Reject),
            other => Err(format!("unknown busy policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Load the matrix as soon as the administration surface opens
    /// Env: RG_MATRIX_LOAD_ON_START
    /// Default: true
    pub load_on_start: bool,

    /// Env: RG_MATRIX_BUSY_POLICY ("queue" or "reject")
    /// Default: queue
    pub busy_policy: BusyPolicy,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self { load_on_start: true, busy_policy: BusyPolicy::Queue }
    }
}

impl MatrixConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(load) = lookup("RG_MATRIX_LOAD_ON_START") {
            self.load_on_start = load.parse().unwrap_or(true);
        }
        if let Some(policy) = lookup("RG_MATRIX_BUSY_POLICY") {
            match policy.parse() {
                Ok(p) => self.busy_policy = p,
                Err(e) => log::warn!("Ignoring RG_MATRIX_BUSY_POLICY: {}", e),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}
