//! # Utility Modules
//!
//! This module provides common utility functions and types used throughout
//! the dsmr-rs crate: the bounded telegram buffer, hex helpers, and logging
//! patterns.

pub mod hex;
pub mod logging;
pub mod rawbuffer;

// Re-export commonly used types and functions
pub use hex::{
    format_checksum, format_hex_compact, hex_nibble, parse_checksum_digits, printable_line,
};
pub use logging::{log_frame_hex, LineLogWindow, LogThrottle};
pub use rawbuffer::{RawBuffer, RawBufferError, RawBufferStats};
