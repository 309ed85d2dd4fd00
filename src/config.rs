use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;

pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Link settings, usually read from `link.yml`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Fixed device path; auto-detected when absent
    pub port_path: Option<String>,
    pub baud_rate: u32,
    /// Bytes requested per read
    pub read_chunk_size: usize,
    /// Upper bound for each individual teardown step
    pub teardown_step_timeout_ms: u64,

    pub npk_delay_ms: u64,
    pub ph_delay_ms: u64,
    pub tank_delay_ms: u64,

    /// Enables the per-severity file logger
    pub log_dir: Option<String>,
    pub debug: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port_path: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_chunk_size: 256,
            teardown_step_timeout_ms: 1000,
            npk_delay_ms: 800,
            ph_delay_ms: 200,
            tank_delay_ms: 800,
            log_dir: None,
            debug: false,
        }
    }
}

impl LinkConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: LinkConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err("baud_rate must be greater than zero".into());
        }
        if self.read_chunk_size == 0 {
            return Err("read_chunk_size must be greater than zero".into());
        }
        if let Some(path) = &self.port_path {
            if path.trim().is_empty() {
                return Err("port_path must not be blank".into());
            }
        }
        Ok(())
    }

    pub fn teardown_step_timeout(&self) -> Duration {
        Duration::from_millis(self.teardown_step_timeout_ms)
    }
}
