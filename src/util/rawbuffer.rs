//! # RawBuffer - Bounded Telegram Buffer
//!
//! This module provides the append-only, size-bounded byte buffer the telegram
//! framer accumulates into. Bytes are only ever appended one telegram at a time
//! and the whole buffer is handed out (or discarded) when the telegram ends, so
//! a plain `Vec<u8>` with a hard limit is all that is needed.
//!
//! ## Usage
//!
//! ```rust
//! use dsmr_rs::util::RawBuffer;
//!
//! let mut buffer = RawBuffer::with_limit(2);
//! buffer.push(b'/').unwrap();
//! buffer.push(b'I').unwrap();
//! assert_eq!(buffer.as_slice(), b"/I");
//! assert!(buffer.push(b'S').is_err());
//! ```

use thiserror::Error;

use crate::constants::{DEFAULT_MAX_TELEGRAM_LEN, RAW_BUFFER_RESERVE};

/// Errors that can occur during RawBuffer operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RawBufferError {
    #[error("Capacity limit exceeded: {limit}")]
    CapacityExceeded { limit: usize },
}

/// Append-only byte buffer with a fixed upper bound
#[derive(Debug, Clone)]
pub struct RawBuffer {
    data: Vec<u8>,
    limit: usize,
    /// Statistics for monitoring
    bytes_written: u64,
    high_water_mark: usize,
}

impl RawBuffer {
    /// Create a buffer bounded by [`DEFAULT_MAX_TELEGRAM_LEN`]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_TELEGRAM_LEN)
    }

    /// Create a buffer that refuses to grow beyond `limit` bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            data: Vec::with_capacity(limit.min(RAW_BUFFER_RESERVE)),
            limit,
            bytes_written: 0,
            high_water_mark: 0,
        }
    }

    /// Maximum number of bytes the buffer will hold
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Append a single byte, failing without modification if the limit is reached
    pub fn push(&mut self, byte: u8) -> Result<(), RawBufferError> {
        if self.data.len() >= self.limit {
            return Err(RawBufferError::CapacityExceeded { limit: self.limit });
        }
        self.data.push(byte);
        self.bytes_written += 1;
        self.high_water_mark = self.high_water_mark.max(self.data.len());
        Ok(())
    }

    /// Move the contents out, leaving the buffer empty
    pub fn take(&mut self) -> Vec<u8> {
        let reserve = self.limit.min(RAW_BUFFER_RESERVE);
        std::mem::replace(&mut self.data, Vec::with_capacity(reserve))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Get buffer statistics
    pub fn stats(&self) -> RawBufferStats {
        RawBufferStats {
            current_len: self.data.len(),
            capacity: self.data.capacity(),
            limit: self.limit,
            bytes_written: self.bytes_written,
            high_water_mark: self.high_water_mark,
        }
    }
}

impl Default for RawBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a RawBuffer instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBufferStats {
    /// Current number of bytes in buffer
    pub current_len: usize,
    /// Current allocated capacity
    pub capacity: usize,
    /// Configured hard limit
    pub limit: usize,
    /// Total bytes written since creation
    pub bytes_written: u64,
    /// Largest length ever held
    pub high_water_mark: usize,
}
