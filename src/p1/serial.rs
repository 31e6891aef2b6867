//! # P1 Serial Port
//!
//! Thin adapter over `tokio-serial` for the P1 port. The meter pushes a
//! telegram every second (DSMR 5) or every ten seconds (DSMR 4); the reader
//! only has to hand whatever bytes arrived to the dispatcher, so the open
//! stream is passed to [`crate::runner::run`] and reassembly is left to the
//! framer.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;

use crate::constants::{DSMR_BAUDRATE, DSMR_LEGACY_BAUDRATE};
use crate::error::DsmrError;

/// Parity setting on the P1 line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum P1Parity {
    #[default]
    None,
    Even,
    Odd,
}

impl From<P1Parity> for tokio_serial::Parity {
    fn from(p: P1Parity) -> Self {
        match p {
            P1Parity::None => tokio_serial::Parity::None,
            P1Parity::Even => tokio_serial::Parity::Even,
            P1Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

/// Configuration for serial connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baudrate: u32,
    /// 8 for DSMR 4/5, 7 for DSMR 2.2/3
    pub data_bits: u8,
    pub parity: P1Parity,
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: "/dev/ttyUSB0".into(),
            baudrate: DSMR_BAUDRATE,
            data_bits: 8,
            parity: P1Parity::None,
            timeout_ms: 5000,
        }
    }
}

impl SerialConfig {
    /// 9600 baud 7E1 as used by DSMR 2.2 and 3.0 meters
    pub fn legacy(port: &str) -> Self {
        SerialConfig {
            port: port.into(),
            baudrate: DSMR_LEGACY_BAUDRATE,
            data_bits: 7,
            parity: P1Parity::Even,
            ..Default::default()
        }
    }

    fn data_bits(&self) -> Result<tokio_serial::DataBits, DsmrError> {
        match self.data_bits {
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            n => Err(DsmrError::ConfigurationError(format!(
                "unsupported data bits: {n}"
            ))),
        }
    }
}

/// Represents an open P1 port, encapsulating the tokio_serial::SerialStream.
pub struct P1Port {
    port: tokio_serial::SerialStream,
    config: SerialConfig,
}

impl P1Port {
    /// Open the port described by `config`
    pub async fn connect_with_config(config: SerialConfig) -> Result<P1Port, DsmrError> {
        let port = tokio_serial::new(&config.port, config.baudrate)
            .data_bits(config.data_bits()?)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(config.parity.into())
            .timeout(Duration::from_millis(config.timeout_ms))
            .open_native_async()
            .map_err(|e| DsmrError::SerialPortError(format!("{}: {e}", config.port)))?;

        log::info!(
            "Opened P1 port {} at {} baud ({} data bits, parity {:?})",
            config.port,
            config.baudrate,
            config.data_bits,
            config.parity
        );
        Ok(P1Port { port, config })
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Hand out the underlying stream, e.g. to [`crate::runner::run`]
    pub fn into_inner(self) -> tokio_serial::SerialStream {
        self.port
    }
}
