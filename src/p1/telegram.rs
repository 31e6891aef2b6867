//! # P1 Telegram
//!
//! A complete telegram as delivered by the framer: the raw bytes from the `/`
//! identification line through the `!` end marker, plus the checksum that
//! followed the end marker. A telegram only lives for one validate and decode
//! pass.

use crate::constants::{P1_END_MARKER, P1_START_MARKER};
use crate::error::DsmrError;
use crate::p1::crc::calculate_crc;
use crate::p1::obis::{parse_obis_line, ObisLine};
use crate::util::hex::format_checksum;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Telegram {
    /// Bytes covered by the checksum, `/` through `!` inclusive
    raw: Vec<u8>,
    /// Checksum transmitted after the end marker
    expected_crc: u16,
}

impl Telegram {
    pub fn new(raw: Vec<u8>, expected_crc: u16) -> Self {
        Self { raw, expected_crc }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn expected_crc(&self) -> u16 {
        self.expected_crc
    }

    pub fn calculated_crc(&self) -> u16 {
        calculate_crc(&self.raw)
    }

    pub fn is_valid(&self) -> bool {
        self.calculated_crc() == self.expected_crc
    }

    /// Check the checksum, reporting both values on mismatch
    pub fn verify(&self) -> Result<(), DsmrError> {
        let calculated = self.calculated_crc();
        if calculated != self.expected_crc {
            return Err(DsmrError::ChecksumMismatch {
                expected: self.expected_crc,
                calculated,
            });
        }
        Ok(())
    }

    /// The identification line without the leading `/`, e.g. `ISk5\2MT382-1000`
    pub fn identification(&self) -> Option<String> {
        let first = self.raw.split(|&b| b == b'\n').next()?;
        let first = first.strip_prefix(&[P1_START_MARKER])?;
        Some(String::from_utf8_lossy(first).trim_end().to_string())
    }

    /// All lines of the telegram, including the marker lines, without `\r\n`
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        self.raw
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
    }

    /// Lines that may carry OBIS data: marker lines and blank lines are left out
    pub fn data_lines(&self) -> impl Iterator<Item = &[u8]> {
        self.lines().filter(|line| {
            !matches!(line.first(), None | Some(&P1_START_MARKER) | Some(&P1_END_MARKER))
                && !line.iter().all(|b| b.is_ascii_whitespace())
        })
    }

    /// Decode every data line; lines that do not parse come back as errors
    pub fn decode(&self) -> Vec<Result<ObisLine, DsmrError>> {
        self.data_lines()
            .map(|line| parse_obis_line(&String::from_utf8_lossy(line)))
            .collect()
    }

    /// The telegram as the meter sent it, including checksum digits
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = self.raw.clone();
        out.extend_from_slice(format_checksum(self.expected_crc).as_bytes());
        out.extend_from_slice(b"\r\n");
        out
    }
}
