//! Integration tests for the telegram framer: reassembly across arbitrary chunk
//! boundaries, the size bound, and recovery after faults.

mod common;

use common::{DSMR5_TELEGRAM, SHORT_TELEGRAM};
use dsmr_rs::p1::{FrameEvent, FramerState, TelegramFramer};
use dsmr_rs::FramingFaultKind;
use proptest::prelude::*;

fn telegrams(events: &[FrameEvent]) -> Vec<&dsmr_rs::Telegram> {
    events
        .iter()
        .filter_map(|e| match e {
            FrameEvent::Complete(t) => Some(t),
            FrameEvent::Error(_) => None,
        })
        .collect()
}

/// Tests that the DSMR 5 sample telegram is framed and carries a valid checksum.
#[test]
fn test_frame_dsmr5_telegram() {
    let mut framer = TelegramFramer::new();
    let events = framer.feed(DSMR5_TELEGRAM);
    let complete = telegrams(&events);
    assert_eq!(events.len(), 1);
    assert_eq!(complete[0].expected_crc(), 0xA291);
    assert!(complete[0].is_valid());
    assert_eq!(complete[0].identification().as_deref(), Some("ISk5\\2MT382-1000"));
    assert_eq!(complete[0].data_lines().count(), 23);
    assert_eq!(framer.state(), FramerState::Idle);
}

/// Tests that noise and partial lines ahead of the first telegram are skipped.
#[test]
fn test_leading_garbage_skipped() {
    let mut stream = b"\x00\xff4*kWh)\r\n1-0:1.7.0(00.4".to_vec();
    stream.extend_from_slice(b"\r\n");
    stream.extend_from_slice(SHORT_TELEGRAM);

    let mut framer = TelegramFramer::new();
    let events = framer.feed(&stream);
    assert_eq!(telegrams(&events).len(), 1);
    assert!(telegrams(&events)[0].is_valid());
}

/// Tests that a telegram larger than the limit is dropped with bounded memory and
/// the following telegram is framed normally.
#[test]
fn test_overflow_then_recovery() {
    let mut framer = TelegramFramer::with_max_len(128);
    let mut stream = b"/ISk5\\2MT382-1000\r\n".to_vec();
    for _ in 0..20 {
        stream.extend_from_slice(b"1-0:1.8.1(123456.789*kWh)\r\n");
    }
    stream.extend_from_slice(b"!0000\r\n");
    stream.extend_from_slice(SHORT_TELEGRAM);

    let mut events = Vec::new();
    for chunk in stream.chunks(7) {
        events.extend(framer.feed(chunk));
        assert!(framer.buffered_len() <= 128);
    }

    assert_eq!(
        events[0],
        FrameEvent::Error(FramingFaultKind::Overflow { limit: 128 })
    );
    let complete = telegrams(&events);
    assert_eq!(complete.len(), 1);
    assert!(complete[0].is_valid());
    assert_eq!(framer.stats().overflows, 1);
    assert_eq!(framer.buffer_stats().high_water_mark, 128);
}

/// Tests that a DSMR 2.2 style telegram without checksum digits is reported as a
/// framing fault instead of being accepted unchecked.
#[test]
fn test_missing_checksum_is_fault() {
    let mut framer = TelegramFramer::new();
    let events = framer.feed(b"/ISk5\\2MT382-1000\r\n1-0:1.8.1(00123.456*kWh)\r\n!\r\n");
    assert_eq!(
        events,
        vec![FrameEvent::Error(FramingFaultKind::InvalidChecksumDigit {
            byte: b'\r'
        })]
    );
    assert_eq!(framer.state(), FramerState::Idle);
}

/// Tests that a telegram cut off by the start of the next one is reported as truncated.
#[test]
fn test_truncated_telegram() {
    let mut stream = b"/ISk5\\2MT382-1000\r\n1-0:1.8.1(0012".to_vec();
    stream.extend_from_slice(b"\r\n");
    stream.extend_from_slice(SHORT_TELEGRAM);

    let mut framer = TelegramFramer::new();
    let events = framer.feed(&stream);
    assert_eq!(events[0], FrameEvent::Error(FramingFaultKind::Truncated));
    assert!(matches!(&events[1], FrameEvent::Complete(t) if t.is_valid()));
}

/// Tests that lowercase checksum digits are accepted.
#[test]
fn test_lowercase_checksum() {
    let mut framer = TelegramFramer::new();
    let events = framer.feed(b"/ISk5\\2MT382-1000\r\n1-0:1.8.0(00123.456*kWh)\r\n!cd4e\r\n");
    assert!(matches!(&events[..], [FrameEvent::Complete(t)] if t.is_valid()));
}

fn stream_of_three() -> Vec<u8> {
    let mut stream = b"junk\r\n".to_vec();
    stream.extend_from_slice(DSMR5_TELEGRAM);
    stream.extend_from_slice(b"/ISk5\\2MT382-1000\r\n1-0:1.8.0(9*kWh)\r\n!12X4\r\n");
    stream.extend_from_slice(SHORT_TELEGRAM);
    stream
}

fn frame_in_chunks(stream: &[u8], sizes: &[usize]) -> Vec<FrameEvent> {
    let mut framer = TelegramFramer::new();
    let mut events = Vec::new();
    let mut rest = stream;
    let mut sizes = sizes.iter().cycle();
    while !rest.is_empty() {
        let n = (*sizes.next().unwrap_or(&1)).clamp(1, rest.len());
        let (chunk, tail) = rest.split_at(n);
        events.extend(framer.feed(chunk));
        // Empty feeds are allowed anywhere
        events.extend(framer.feed(&[]));
        rest = tail;
    }
    events
}

/// Tests that feeding the stream one byte at a time matches a single feed.
#[test]
fn test_byte_at_a_time_matches_single_feed() {
    let stream = stream_of_three();
    let mut framer = TelegramFramer::new();
    let whole = framer.feed(&stream);
    assert_eq!(whole.len(), 3);
    assert_eq!(frame_in_chunks(&stream, &[1]), whole);
}

proptest! {
    /// The framer's output does not depend on how the stream was split.
    #[test]
    fn prop_chunking_invariance(sizes in proptest::collection::vec(1usize..64, 1..32)) {
        let stream = stream_of_three();
        let mut framer = TelegramFramer::new();
        let whole = framer.feed(&stream);
        prop_assert_eq!(frame_in_chunks(&stream, &sizes), whole);
    }

    /// Arbitrary input never panics and never grows the buffer past its limit.
    #[test]
    fn prop_arbitrary_bytes_bounded(bytes in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let mut framer = TelegramFramer::with_max_len(256);
        for chunk in bytes.chunks(33) {
            framer.feed(chunk);
            prop_assert!(framer.buffered_len() <= 256);
        }
    }
}
