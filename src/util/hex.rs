//! # Hex Helpers
//!
//! Small hex utilities shared by the checksum validator, the framer and the
//! logging helpers: nibble decoding for the 4-digit telegram checksum, the
//! canonical uppercase rendering of a checksum, and compact dumps of raw bytes
//! (built on the `hex` crate) for debugging line noise on the P1 port.

/// Value of a single ASCII hex digit, accepting both cases
pub fn hex_nibble(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Parse exactly four hex digits into a checksum value
pub fn parse_checksum_digits(digits: &[u8]) -> Option<u16> {
    if digits.len() != 4 {
        return None;
    }
    digits
        .iter()
        .try_fold(0u16, |acc, &b| Some((acc << 4) | hex_nibble(b)? as u16))
}

/// Render a checksum the way meters transmit it: 4 uppercase hex digits
pub fn format_checksum(crc: u16) -> String {
    hex::encode_upper(crc.to_be_bytes())
}

/// Format bytes for compact display in logs, e.g. "2f 49 53 6b"
pub fn format_hex_compact(data: &[u8]) -> String {
    let encoded = hex::encode(data);
    let mut out = String::with_capacity(encoded.len() + data.len());
    for (i, pair) in encoded.as_bytes().chunks(2).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push(pair[0] as char);
        out.push(pair[1] as char);
    }
    out
}

/// Make a telegram line printable: control bytes become `\xNN`, `\r`/`\n` are dropped
pub fn printable_line(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());
    for &b in data {
        match b {
            b'\r' | b'\n' => {}
            0x20..=0x7E => out.push(b as char),
            _ => out.push_str(&format!("\\x{b:02X}")),
        }
    }
    out
}
