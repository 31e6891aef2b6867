//! # P1 Telegram Framer
//!
//! Byte-driven state machine that reassembles telegrams from a serial stream
//! delivered in arbitrary chunks. It never blocks and keeps all progress in
//! its own state, so a caller can hand it whatever the port produced on each
//! poll, including nothing at all or half a line.
//!
//! ```text
//!   Idle --'/' at line start--> Capturing --'!' at line start--> AwaitingChecksum
//!    ^                              |                                   |
//!    |                        overflow / new '/'                  4 hex digits
//!    |                              v                                   v
//!    +-------------------------- Error                              Complete
//!    +------------------------------------------------------------------+
//! ```
//!
//! `Complete` and `Error` are reported as [`FrameEvent`]s and the framer is
//! back in `Idle` once the byte that caused them has been consumed.
//!
//! ## Usage
//!
//! ```rust
//! use dsmr_rs::p1::{FrameEvent, TelegramFramer};
//!
//! let mut framer = TelegramFramer::new();
//! assert!(framer.feed(b"/ISk5\\2MT382-1000\r\n1-0:1.8.0(00123.456*kWh)\r\n").is_empty());
//! let events = framer.feed(b"!CD4E\r\n");
//! assert!(matches!(&events[..], [FrameEvent::Complete(t)] if t.is_valid()));
//! ```

use crate::constants::{
    DEFAULT_MAX_TELEGRAM_LEN, MIN_TELEGRAM_LEN, P1_CHECKSUM_DIGITS, P1_END_MARKER,
    P1_START_MARKER,
};
use crate::error::FramingFaultKind;
use crate::p1::telegram::Telegram;
use crate::util::hex::{hex_nibble, parse_checksum_digits};
use crate::util::{RawBuffer, RawBufferStats};

/// Resting states of the framer between bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// Scanning for `/` at the start of a line
    Idle,
    /// Accumulating telegram lines until `!` starts a line
    Capturing,
    /// Collecting the four checksum digits after `!`
    AwaitingChecksum,
}

/// What the framer produced for a byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A telegram was terminated by its checksum; it has not been validated yet
    Complete(Telegram),
    /// The partial telegram was discarded
    Error(FramingFaultKind),
}

/// Counters kept by the framer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FramerStats {
    pub bytes_consumed: u64,
    pub telegrams_completed: u64,
    pub overflows: u64,
    pub invalid_checksum_digits: u64,
    pub truncated: u64,
}

impl FramerStats {
    pub fn faults(&self) -> u64 {
        self.overflows + self.invalid_checksum_digits + self.truncated
    }
}

#[derive(Debug)]
pub struct TelegramFramer {
    state: FramerState,
    buffer: RawBuffer,
    checksum: [u8; P1_CHECKSUM_DIGITS],
    checksum_len: usize,
    /// The previous byte was `\n` (or nothing has been received yet)
    at_line_start: bool,
    stats: FramerStats,
}

impl TelegramFramer {
    /// Framer bounded by [`DEFAULT_MAX_TELEGRAM_LEN`]
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_TELEGRAM_LEN)
    }

    /// Framer that gives up on telegrams longer than `max_len` bytes.
    ///
    /// Values below [`MIN_TELEGRAM_LEN`] are raised to it.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            state: FramerState::Idle,
            buffer: RawBuffer::with_limit(max_len.max(MIN_TELEGRAM_LEN)),
            checksum: [0; P1_CHECKSUM_DIGITS],
            checksum_len: 0,
            at_line_start: true,
            stats: FramerStats::default(),
        }
    }

    pub fn state(&self) -> FramerState {
        self.state
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    pub fn max_len(&self) -> usize {
        self.buffer.limit()
    }

    /// Bytes of the telegram currently being captured
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Allocation and high-water mark of the capture buffer
    pub fn buffer_stats(&self) -> RawBufferStats {
        self.buffer.stats()
    }

    /// Drop any partial telegram and wait for the next start marker
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.checksum_len = 0;
        self.state = FramerState::Idle;
    }

    /// Consume a chunk of bytes, returning every event it produced in order
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<FrameEvent> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    /// Consume a single byte
    pub fn push_byte(&mut self, byte: u8) -> Option<FrameEvent> {
        let line_start = self.at_line_start;
        self.at_line_start = byte == b'\n';
        self.stats.bytes_consumed += 1;

        match self.state {
            FramerState::Idle => {
                if line_start && byte == P1_START_MARKER {
                    self.start_capture();
                    return self.append(byte);
                }
                None
            }
            FramerState::Capturing => {
                if line_start && byte == P1_START_MARKER {
                    let fault = self.fail(FramingFaultKind::Truncated);
                    self.start_capture();
                    // Cannot overflow: the buffer was just cleared
                    self.append(byte);
                    return Some(fault);
                }
                let event = self.append(byte);
                if event.is_none() && line_start && byte == P1_END_MARKER {
                    self.checksum_len = 0;
                    self.state = FramerState::AwaitingChecksum;
                }
                event
            }
            FramerState::AwaitingChecksum => {
                if hex_nibble(byte).is_none() {
                    return Some(self.fail(FramingFaultKind::InvalidChecksumDigit { byte }));
                }
                self.checksum[self.checksum_len] = byte;
                self.checksum_len += 1;
                if self.checksum_len < P1_CHECKSUM_DIGITS {
                    return None;
                }
                Some(self.complete())
            }
        }
    }

    fn start_capture(&mut self) {
        self.buffer.clear();
        self.checksum_len = 0;
        self.state = FramerState::Capturing;
    }

    fn append(&mut self, byte: u8) -> Option<FrameEvent> {
        match self.buffer.push(byte) {
            Ok(()) => None,
            Err(_) => Some(self.fail(FramingFaultKind::Overflow {
                limit: self.buffer.limit(),
            })),
        }
    }

    fn complete(&mut self) -> FrameEvent {
        // All four digits passed hex_nibble
        let expected = parse_checksum_digits(&self.checksum).unwrap_or_default();
        let raw = self.buffer.take();
        self.checksum_len = 0;
        self.state = FramerState::Idle;
        self.stats.telegrams_completed += 1;
        log::debug!(
            "Telegram complete: {} bytes, checksum {:04X}",
            raw.len(),
            expected
        );
        FrameEvent::Complete(Telegram::new(raw, expected))
    }

    fn fail(&mut self, kind: FramingFaultKind) -> FrameEvent {
        match kind {
            FramingFaultKind::Overflow { .. } => self.stats.overflows += 1,
            FramingFaultKind::InvalidChecksumDigit { .. } => {
                self.stats.invalid_checksum_digits += 1
            }
            FramingFaultKind::Truncated => self.stats.truncated += 1,
        }
        log::debug!(
            "Discarding {} buffered bytes: {}",
            self.buffer.len(),
            kind
        );
        self.reset();
        FrameEvent::Error(kind)
    }
}

impl Default for TelegramFramer {
    fn default() -> Self {
        Self::new()
    }
}
