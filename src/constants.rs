//! DSMR P1 Protocol Constants
//!
//! This module defines constants used by the P1 telegram reader, based on the
//! DSMR 4.x/5.x P1 companion standard.

/// First character of the identification line that opens a telegram
pub const P1_START_MARKER: u8 = b'/';

/// First character of the line that closes a telegram, followed by the CRC
pub const P1_END_MARKER: u8 = b'!';

/// Number of hex digits in the telegram checksum
pub const P1_CHECKSUM_DIGITS: usize = 4;

/// Opening delimiter of an OBIS value group
pub const OBIS_GROUP_OPEN: char = '(';

/// Closing delimiter of an OBIS value group
pub const OBIS_GROUP_CLOSE: char = ')';

/// Separator between a numeric value and its unit inside a group
pub const OBIS_UNIT_SEPARATOR: char = '*';

// ----------------------------------------------------------------------------
// Buffer limits
// ----------------------------------------------------------------------------

/// Default upper bound for a telegram held by the framer
pub const DEFAULT_MAX_TELEGRAM_LEN: usize = 4096;

/// Smallest configurable telegram bound (start line + end line + checksum)
pub const MIN_TELEGRAM_LEN: usize = 16;

/// Initial allocation for the raw buffer; typical DSMR 5 telegrams fit
pub const RAW_BUFFER_RESERVE: usize = 2048;

// ----------------------------------------------------------------------------
// Timing and serial defaults
// ----------------------------------------------------------------------------

/// Default validity window for a cached value (ms)
pub const DEFAULT_VALIDITY_WINDOW_MS: u64 = 10_000;

/// Default tick interval for staleness sweeps (ms)
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 500;

/// DSMR 4.x/5.x P1 baud rate (8N1)
pub const DSMR_BAUDRATE: u32 = 115_200;

/// DSMR 2.2/3.0 P1 baud rate (7E1)
pub const DSMR_LEGACY_BAUDRATE: u32 = 9_600;

/// Raw telegram lines logged per telegram at debug level
pub const LOG_LINES_PER_TELEGRAM: usize = 10;
