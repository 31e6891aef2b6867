//! The p1 module contains the components responsible for the DSMR P1 protocol:
//! checksum validation, telegram framing, OBIS line decoding, and the serial
//! port adapter.

pub mod crc;
pub mod framer;
pub mod obis;
pub mod serial;
pub mod telegram;

pub use crc::{calculate_crc, seal_telegram, verify_crc, verify_crc_digits};
pub use framer::{FrameEvent, FramerState, FramerStats, TelegramFramer};
pub use obis::{obis_line, parse_obis_line, ObisLine, ObisValue};
pub use serial::{P1Parity, P1Port, SerialConfig};
pub use telegram::Telegram;
