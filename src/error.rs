//! # DSMR Error Handling
//!
//! This module defines the DsmrError enum, which represents the different error
//! types that can occur in the dsmr-rs crate.

use std::fmt;
use thiserror::Error;

/// Why the telegram framer gave up on the bytes it had accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingFaultKind {
    /// The raw buffer reached its size limit before the end marker arrived.
    Overflow { limit: usize },
    /// A character following the end marker was not a hex digit.
    InvalidChecksumDigit { byte: u8 },
    /// A new start marker arrived before the current telegram was terminated.
    Truncated,
}

impl fmt::Display for FramingFaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramingFaultKind::Overflow { limit } => {
                write!(f, "telegram exceeds {limit} bytes")
            }
            FramingFaultKind::InvalidChecksumDigit { byte } => {
                write!(f, "invalid checksum digit 0x{byte:02X}")
            }
            FramingFaultKind::Truncated => write!(f, "telegram truncated by a new start marker"),
        }
    }
}

/// Represents the different error types that can occur in the DSMR crate.
#[derive(Debug, Error)]
pub enum DsmrError {
    /// The framer discarded a partial telegram.
    #[error("Framing fault: {0}")]
    FramingFault(FramingFaultKind),

    /// The CRC carried by the telegram does not match its contents.
    #[error("Checksum mismatch: expected {expected:04X}, calculated {calculated:04X}")]
    ChecksumMismatch { expected: u16, calculated: u16 },

    /// A telegram line does not have the `code(value)` shape.
    #[error("Unparsable line: {0}")]
    UnparsableLine(String),

    /// A decoded OBIS code has no registered binding.
    #[error("Unknown OBIS code: {0}")]
    UnknownCode(String),

    /// Invalid bindings or options supplied at startup.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DsmrError {
    /// Per-telegram conditions the engine keeps running after.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DsmrError::FramingFault(_)
                | DsmrError::ChecksumMismatch { .. }
                | DsmrError::UnparsableLine(_)
                | DsmrError::UnknownCode(_)
        )
    }
}
