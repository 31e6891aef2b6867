//! # Reader Configuration
//!
//! Declarative configuration for the P1 reader, loaded from a JSON file:
//!
//! ```json
//! {
//!   "validity_window_ms": 10000,
//!   "update_interval_ms": 500,
//!   "serial": { "port": "/dev/ttyUSB0", "baudrate": 115200 },
//!   "sensors": [
//!     { "obis": "1-0:1.8.1", "channel": "energy_delivered_tariff1" },
//!     { "obis": "1-0:1.7.0", "channel": "power_delivered" }
//!   ]
//! }
//! ```
//!
//! Every field except `sensors` has a default. [`P1Config::validate`] runs
//! before the reader starts; a configuration error is the only fatal error
//! the reader has.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::constants::{
    DEFAULT_MAX_TELEGRAM_LEN, DEFAULT_UPDATE_INTERVAL_MS, DEFAULT_VALIDITY_WINDOW_MS,
    MIN_TELEGRAM_LEN,
};
use crate::error::DsmrError;
use crate::p1::serial::SerialConfig;

/// One OBIS code to watch and the channel its value is published on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub obis: String,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct P1Config {
    /// Age after which a value is reported stale; 0 disables expiry
    pub validity_window_ms: u64,
    /// Interval between staleness sweeps
    pub update_interval_ms: u64,
    /// Largest telegram the framer will hold
    pub max_telegram_len: usize,
    pub serial: SerialConfig,
    pub sensors: Vec<SensorConfig>,
}

impl Default for P1Config {
    fn default() -> Self {
        Self {
            validity_window_ms: DEFAULT_VALIDITY_WINDOW_MS,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            max_telegram_len: DEFAULT_MAX_TELEGRAM_LEN,
            serial: SerialConfig::default(),
            sensors: Vec::new(),
        }
    }
}

impl P1Config {
    /// Read and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DsmrError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        log::info!(
            "Loaded configuration from {}: {} sensors",
            path.display(),
            config.sensors.len()
        );
        Ok(config)
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(text: &str) -> Result<Self, DsmrError> {
        let config: P1Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validity_window(&self) -> Duration {
        Duration::from_millis(self.validity_window_ms)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Reject configurations the reader cannot run with
    pub fn validate(&self) -> Result<(), DsmrError> {
        if self.update_interval_ms == 0 {
            return Err(DsmrError::ConfigurationError(
                "update_interval_ms must be greater than zero".into(),
            ));
        }
        if self.max_telegram_len < MIN_TELEGRAM_LEN {
            return Err(DsmrError::ConfigurationError(format!(
                "max_telegram_len must be at least {MIN_TELEGRAM_LEN}, got {}",
                self.max_telegram_len
            )));
        }

        let mut seen = HashSet::new();
        for (i, sensor) in self.sensors.iter().enumerate() {
            let obis = sensor.obis.trim();
            if obis.is_empty() {
                return Err(DsmrError::ConfigurationError(format!(
                    "sensor #{i} has an empty OBIS code"
                )));
            }
            if sensor.channel.trim().is_empty() {
                return Err(DsmrError::ConfigurationError(format!(
                    "sensor #{i} ({obis}) has an empty channel"
                )));
            }
            if !seen.insert(obis) {
                return Err(DsmrError::ConfigurationError(format!(
                    "OBIS code {obis} is bound more than once"
                )));
            }
        }
        Ok(())
    }
}
