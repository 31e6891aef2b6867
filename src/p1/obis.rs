//! # OBIS Line Decoder
//!
//! Decodes one line of a P1 telegram into an [`ObisLine`]. A data line is an
//! OBIS reference followed by one or more parenthesised value groups:
//!
//! ```text
//! 1-0:1.8.1(001234.567*kWh)
//! 0-0:1.0.0(230101120000W)
//! 0-1:24.2.1(230101120000W)(01234.567*m3)
//! 1-0:99.97.0(1)(0-0:96.7.19)(000101000001W)(2147483647*s)
//! ```
//!
//! A group is either a number with an optional `*unit` suffix, or an opaque
//! string (timestamps, equipment identifiers, hex-encoded text) which is kept
//! verbatim. Decoding is a pure per-line transform built from `nom`
//! combinators; lines without the `code(...)` shape are rejected with
//! [`DsmrError::UnparsableLine`] and the caller simply skips them.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{all_consuming, opt, recognize},
    multi::many1,
    sequence::{delimited, pair, tuple},
    IResult,
};

use crate::constants::{OBIS_GROUP_CLOSE, OBIS_GROUP_OPEN, OBIS_UNIT_SEPARATOR};
use crate::error::DsmrError;

/// One parenthesised group of an OBIS line
#[derive(Debug, Clone, PartialEq)]
pub struct ObisValue {
    /// Group contents exactly as received, without the parentheses
    pub raw: String,
    /// Numeric value, if the group (before any `*unit`) is a plain decimal
    pub numeric: Option<f64>,
    /// Unit following `*`; empty when absent or when the group is not numeric
    pub unit: String,
}

impl ObisValue {
    fn from_group(raw: &str) -> Self {
        let (number, unit) = match raw.split_once(OBIS_UNIT_SEPARATOR) {
            Some((number, unit)) => (number, unit),
            None => (raw, ""),
        };
        let numeric = parse_decimal(number.trim());
        ObisValue {
            raw: raw.to_string(),
            numeric,
            unit: if numeric.is_some() {
                unit.trim().to_string()
            } else {
                String::new()
            },
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric.is_some()
    }
}

/// A decoded telegram line: OBIS reference plus its value groups
#[derive(Debug, Clone, PartialEq)]
pub struct ObisLine {
    pub code: String,
    pub values: Vec<ObisValue>,
}

impl ObisLine {
    /// The measurement carried by the line: the last group holding a number.
    ///
    /// Gas and water readings (`0-n:24.2.1`) put the capture timestamp in the
    /// first group and the reading in the last one.
    pub fn reading(&self) -> Option<(f64, &str)> {
        self.values
            .iter()
            .rev()
            .find_map(|v| v.numeric.map(|n| (n, v.unit.as_str())))
    }
}

/// Characters allowed in an OBIS reference such as `1-0:1.8.0`
pub fn is_obis_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | ':' | '.')
}

fn is_line_noise(c: char) -> bool {
    !c.is_ascii_graphic()
}

fn obis_code(input: &str) -> IResult<&str, &str> {
    // Stray control bytes and spaces in front of the reference are skipped
    let (input, _) = take_while(is_line_noise)(input)?;
    take_while1(is_obis_char)(input)
}

fn value_group(input: &str) -> IResult<&str, &str> {
    delimited(
        char(OBIS_GROUP_OPEN),
        take_while(|c| c != OBIS_GROUP_CLOSE),
        char(OBIS_GROUP_CLOSE),
    )(input)
}

fn decimal(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(digit1, opt(pair(char('.'), digit0)))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(input)
}

fn parse_decimal(text: &str) -> Option<f64> {
    let (_, number) = all_consuming(decimal)(text).ok()?;
    number.parse().ok()
}

/// Parse an OBIS line with `nom`, returning whatever follows the last group.
pub fn obis_line(input: &str) -> IResult<&str, ObisLine> {
    let (input, code) = obis_code(input)?;
    let (input, groups) = many1(value_group)(input)?;
    Ok((
        input,
        ObisLine {
            code: code.to_string(),
            values: groups.into_iter().map(ObisValue::from_group).collect(),
        },
    ))
}

/// Decode one telegram line.
///
/// Trailing bytes after the last group (usually `\r`) are ignored.
pub fn parse_obis_line(line: &str) -> Result<ObisLine, DsmrError> {
    obis_line(line)
        .map(|(_, parsed)| parsed)
        .map_err(|_| DsmrError::UnparsableLine(line.trim_end().to_string()))
}
