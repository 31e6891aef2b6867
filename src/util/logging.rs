//! # Logging Utilities
//!
//! Logging patterns for the P1 reader: rate limiting so a disconnected or
//! noisy port cannot flood the log, hex dumps of bytes that are not text, and a
//! rotating window over telegram lines so a full telegram can be inspected at
//! debug level across several consecutive telegrams.
//!
//! ## Usage
//!
//! ```rust
//! use dsmr_rs::util::logging::LogThrottle;
//!
//! // Rate-limited logging
//! let mut throttle = LogThrottle::new(1000, 5); // 5 messages per second
//! if throttle.allow() {
//!     log::warn!("CRC error detected");
//! }
//! ```

use std::time::Instant;

use crate::constants::LOG_LINES_PER_TELEGRAM;

/// Throttling structure for rate-limiting log messages
#[derive(Debug)]
pub struct LogThrottle {
    /// Time window for throttling (in milliseconds)
    window_ms: u64,
    /// Maximum messages allowed per window
    cap: u32,
    /// Current message count in window
    count: u32,
    /// Start time of current window
    t0: Instant,
}

impl LogThrottle {
    /// Create new throttle with time window and message cap
    ///
    /// # Arguments
    /// * `window_ms` - Time window in milliseconds
    /// * `cap` - Maximum messages allowed per window
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            t0: Instant::now(),
        }
    }

    /// Check if logging is allowed (resets counter after window expires)
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.t0).as_millis() as u64;

        if elapsed_ms > self.window_ms {
            self.t0 = now;
            self.count = 0;
        }

        self.count += 1;
        self.count <= self.cap
    }
}

/// Log raw bytes in hex format for debugging
///
/// Output is limited to the first 64 bytes.
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    const MAX_LOG_BYTES: usize = 64;

    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let hex_str = crate::util::hex::format_hex_compact(shown);
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };

    log::debug!("{prefix}: {hex_str}{suffix}");
}

/// Rotating window over telegram lines.
///
/// Each telegram logs a block of `lines_per_telegram` lines; the block advances
/// by that amount on every telegram and wraps once it runs past the end, so a
/// long telegram is fully visible after a few receptions.
#[derive(Debug, Clone)]
pub struct LineLogWindow {
    start: usize,
    lines_per_telegram: usize,
}

impl LineLogWindow {
    pub fn new(lines_per_telegram: usize) -> Self {
        Self {
            start: 0,
            lines_per_telegram: lines_per_telegram.max(1),
        }
    }

    /// Whether the 0-based `line` falls into the current window
    pub fn contains(&self, line: usize) -> bool {
        line >= self.start && line < self.start + self.lines_per_telegram
    }

    /// Advance the window after a telegram of `total_lines` lines
    pub fn advance(&mut self, total_lines: usize) {
        if total_lines == 0 {
            return;
        }
        self.start += self.lines_per_telegram;
        if self.start >= total_lines {
            self.start = 0;
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }
}

impl Default for LineLogWindow {
    fn default() -> Self {
        Self::new(LOG_LINES_PER_TELEGRAM)
    }
}

/// Log a warning with throttling
#[macro_export]
macro_rules! log_warn_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::warn!($($arg)*);
        }
    };
}

/// Debug logging utilities for protocol analysis
pub mod debug {
    use crate::util::hex::format_checksum;

    /// Log CRC validation results
    pub fn log_crc_result(expected: u16, calculated: u16, valid: bool) {
        if valid {
            log::debug!("CRC valid: {}", format_checksum(expected));
        } else {
            log::warn!(
                "DSMR checksum mismatch: calc={} recv={}",
                format_checksum(calculated),
                format_checksum(expected)
            );
        }
    }
}
