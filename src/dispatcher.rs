//! # Telegram Dispatcher
//!
//! Ties the framer, checksum validation, OBIS decoding and the sensor
//! registry together behind two entry points:
//!
//! - [`Dispatcher::feed`] hands over whatever bytes the transport produced.
//!   Every telegram completed by those bytes is validated; only a telegram
//!   whose checksum matches is decoded and written to the registry, so a
//!   corrupted telegram never touches a cached value.
//! - [`Dispatcher::tick`] runs the periodic staleness sweep.
//!
//! Neither call blocks, performs I/O or fails: per-telegram problems are
//! counted, logged and returned in the [`FeedOutcome`].
//!
//! ```rust
//! use dsmr_rs::dispatcher::Dispatcher;
//! use dsmr_rs::registry::SensorEvent;
//! use std::time::{Duration, Instant};
//!
//! let mut dispatcher = Dispatcher::new(Duration::from_secs(10), 4096);
//! dispatcher.register("1-0:1.8.0", "energy".into()).unwrap();
//!
//! let outcome = dispatcher.feed(
//!     b"/ISk5\\2MT382-1000\r\n1-0:1.8.0(00123.456*kWh)\r\n!CD4E\r\n",
//!     Instant::now(),
//! );
//! assert_eq!(outcome.telegrams, 1);
//! assert!(outcome.events.iter().any(|e| matches!(
//!     e,
//!     SensorEvent::Value { value, unit, .. } if *value == 123.456 && unit == "kWh"
//! )));
//! ```

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::config::P1Config;
use crate::error::{DsmrError, FramingFaultKind};
use crate::log_warn_throttled;
use crate::p1::framer::{FrameEvent, TelegramFramer};
use crate::p1::telegram::Telegram;
use crate::registry::{Channel, SensorEvent, SensorRegistry, SensorState};
use crate::util::hex::printable_line;
use crate::util::logging::{debug::log_crc_result, log_frame_hex, LineLogWindow, LogThrottle};

/// Window and cap for fault warnings
const FAULT_LOG_WINDOW_MS: u64 = 10_000;
const FAULT_LOG_CAP: u32 = 5;

/// Counters for dispatcher monitoring
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherStats {
    /// Telegrams completed by the framer
    pub telegrams_seen: u64,
    /// Telegrams that passed the checksum
    pub telegrams_valid: u64,
    pub checksum_mismatches: u64,
    pub framing_faults: u64,
    pub lines_decoded: u64,
    /// Data lines that were not `code(value)` shaped
    pub lines_skipped: u64,
    /// Decoded lines without a numeric value group
    pub lines_without_value: u64,
    pub unknown_codes: u64,
    pub updates_applied: u64,
    pub ticks: u64,
}

impl DispatcherStats {
    /// Checksum mismatches and framing faults together
    pub fn faults(&self) -> u64 {
        self.checksum_mismatches + self.framing_faults
    }
}

/// Result of one [`Dispatcher::feed`] call
#[derive(Debug, Default)]
pub struct FeedOutcome {
    /// Registry events in the order the lines were applied
    pub events: Vec<SensorEvent>,
    /// Checksum-verified telegrams applied to the registry
    pub telegrams: usize,
    /// Framing faults and checksum mismatches, in stream order
    pub faults: Vec<DsmrError>,
}

impl FeedOutcome {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.telegrams == 0 && self.faults.is_empty()
    }

    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    framer: TelegramFramer,
    registry: SensorRegistry,
    stats: DispatcherStats,
    line_log: LineLogWindow,
    framing_log: LogThrottle,
    checksum_log: LogThrottle,
}

impl Dispatcher {
    /// Dispatcher with an empty registry
    pub fn new(validity_window: Duration, max_telegram_len: usize) -> Self {
        Self::with_parts(
            TelegramFramer::with_max_len(max_telegram_len),
            SensorRegistry::new(validity_window),
        )
    }

    pub fn with_parts(framer: TelegramFramer, registry: SensorRegistry) -> Self {
        Self {
            framer,
            registry,
            stats: DispatcherStats::default(),
            line_log: LineLogWindow::default(),
            framing_log: LogThrottle::new(FAULT_LOG_WINDOW_MS, FAULT_LOG_CAP),
            checksum_log: LogThrottle::new(FAULT_LOG_WINDOW_MS, FAULT_LOG_CAP),
        }
    }

    /// Validate `config` and register all of its sensors
    pub fn from_config(config: &P1Config) -> Result<Self, DsmrError> {
        config.validate()?;
        let mut dispatcher = Self::new(config.validity_window(), config.max_telegram_len);
        for sensor in &config.sensors {
            dispatcher.register(&sensor.obis, Channel::new(sensor.channel.as_str()))?;
        }
        log::info!(
            "DSMR dispatcher ready: {} sensors, validity window {} ms, max telegram {} bytes",
            dispatcher.registry.len(),
            config.validity_window_ms,
            dispatcher.framer.max_len()
        );
        Ok(dispatcher)
    }

    pub fn register(&mut self, code: &str, channel: Channel) -> Result<(), DsmrError> {
        self.registry.register(code, channel)
    }

    /// Consume a chunk of bytes of any length, including zero
    pub fn feed(&mut self, bytes: &[u8], now: Instant) -> FeedOutcome {
        let mut outcome = FeedOutcome::default();
        for event in self.framer.feed(bytes) {
            match event {
                FrameEvent::Complete(telegram) => {
                    self.process_telegram(&telegram, now, &mut outcome)
                }
                FrameEvent::Error(kind) => {
                    self.record_framing_fault(kind);
                    outcome.faults.push(DsmrError::FramingFault(kind));
                }
            }
        }
        outcome
    }

    /// Periodic staleness sweep
    pub fn tick(&mut self, now: Instant) -> Vec<SensorEvent> {
        self.stats.ticks += 1;
        self.registry.sweep(now)
    }

    /// Current value of every channel, `None` where stale
    pub fn snapshot(&self) -> Vec<SensorState> {
        self.registry.snapshot()
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    pub fn framer(&self) -> &TelegramFramer {
        &self.framer
    }

    pub fn stats(&self) -> DispatcherStats {
        self.stats
    }

    fn record_framing_fault(&mut self, kind: FramingFaultKind) {
        self.stats.framing_faults += 1;
        log_warn_throttled!(
            self.framing_log,
            "DSMR framing fault: {kind}; waiting for next telegram"
        );
    }

    fn process_telegram(&mut self, telegram: &Telegram, now: Instant, outcome: &mut FeedOutcome) {
        self.stats.telegrams_seen += 1;

        let valid = telegram.verify();
        if let Err(DsmrError::ChecksumMismatch { expected, calculated }) = &valid {
            self.stats.checksum_mismatches += 1;
            if self.checksum_log.allow() {
                log_crc_result(*expected, *calculated, false);
                log_frame_hex("Rejected telegram", telegram.raw());
            }
        }
        if let Err(e) = valid {
            outcome.faults.push(e);
            return;
        }
        log_crc_result(telegram.expected_crc(), telegram.expected_crc(), true);
        self.stats.telegrams_valid += 1;
        self.log_lines(telegram);

        let mut records = 0usize;
        let mut decoded = 0usize;
        for line in telegram.decode() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    self.stats.lines_skipped += 1;
                    log::trace!("Skipping telegram line: {e}");
                    continue;
                }
            };
            decoded += 1;
            self.stats.lines_decoded += 1;

            let Some((value, unit)) = line.reading() else {
                self.stats.lines_without_value += 1;
                if self.registry.contains(&line.code) {
                    log::debug!("OBIS {} carries no numeric value", line.code);
                }
                continue;
            };

            match self.registry.update(&line.code, value, unit, now) {
                Ok(events) => {
                    records += 1;
                    self.stats.updates_applied += 1;
                    outcome.events.extend(events);
                }
                Err(DsmrError::UnknownCode(_)) => self.stats.unknown_codes += 1,
                Err(e) => log::warn!("Failed to apply OBIS {}: {e}", line.code),
            }
        }

        outcome.telegrams += 1;
        if records == 0 {
            log::warn!("DSMR telegram contained no usable records ({decoded} lines decoded)");
        } else {
            log::info!("Parsed DSMR telegram: {decoded} lines, {records} records");
        }
    }

    fn log_lines(&mut self, telegram: &Telegram) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        let mut total = 0;
        for (i, line) in telegram.lines().enumerate() {
            if self.line_log.contains(i) {
                log::debug!("line {:3}: {}", i + 1, printable_line(line));
            }
            total = i + 1;
        }
        self.line_log.advance(total);
    }
}
