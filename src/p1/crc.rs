//! # P1 Telegram Checksum
//!
//! DSMR 4.x/5.x terminate every telegram with `!` followed by four hex digits:
//! a CRC-16/ARC (polynomial 0x8005 reflected as 0xA001, initial value 0x0000,
//! no final xor) computed over all bytes from the leading `/` up to and
//! including the `!`. The checksum digits themselves are not covered.

use crc::{Crc, CRC_16_ARC};

use crate::util::hex::{format_checksum, parse_checksum_digits};

const DSMR_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

/// Calculate the CRC-16/ARC of `data`
pub fn calculate_crc(data: &[u8]) -> u16 {
    DSMR_CRC.checksum(data)
}

/// Compare the CRC of `data` with an expected value
pub fn verify_crc(data: &[u8], expected: u16) -> bool {
    calculate_crc(data) == expected
}

/// Compare the CRC of `data` with checksum digits as received from the meter.
///
/// Digits are accepted in either case; anything other than exactly four hex
/// digits never matches.
pub fn verify_crc_digits(data: &[u8], digits: &[u8]) -> bool {
    parse_checksum_digits(digits).is_some_and(|expected| verify_crc(data, expected))
}

/// Append `!` and the matching checksum digits to a telegram body.
///
/// `body` must start with the `/` identification line and end right before the
/// end marker. Used to build test telegrams and replay captures.
pub fn seal_telegram(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 7);
    out.extend_from_slice(body);
    out.push(crate::constants::P1_END_MARKER);
    let crc = calculate_crc(&out);
    out.extend_from_slice(format_checksum(crc).as_bytes());
    out.extend_from_slice(b"\r\n");
    out
}
