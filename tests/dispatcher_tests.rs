//! End-to-end tests for the dispatcher: checksum gating, registry updates,
//! isolation of unknown codes, staleness and recovery after faults.

mod common;

use std::time::{Duration, Instant};

use common::{dispatcher_with, DASHBOARD_SENSORS, DSMR5_TELEGRAM, SHORT_TELEGRAM};
use dsmr_rs::p1::seal_telegram;
use dsmr_rs::{Dispatcher, DsmrError, FramingFaultKind, SensorEvent};

fn value_of(dispatcher: &Dispatcher, code: &str) -> Option<(f64, String)> {
    let entry = dispatcher.registry().get(code)?;
    Some((entry.last_value()?, entry.last_unit().to_string()))
}

/// Tests the reference telegram: the bound code receives 123.456 kWh.
#[test]
fn test_short_telegram_updates_binding() {
    let mut dispatcher = dispatcher_with(&[("1-0:1.8.0", "energy")]);
    let now = Instant::now();
    let outcome = dispatcher.feed(SHORT_TELEGRAM, now);

    assert_eq!(outcome.telegrams, 1);
    assert!(outcome.faults.is_empty());
    assert_eq!(
        outcome.events,
        vec![
            SensorEvent::Stale {
                channel: "energy".into(),
                stale: false
            },
            SensorEvent::Value {
                channel: "energy".into(),
                code: "1-0:1.8.0".into(),
                value: 123.456,
                unit: "kWh".into()
            },
        ]
    );

    let entry = dispatcher.registry().get("1-0:1.8.0").unwrap();
    assert_eq!(entry.last_update(), Some(now));
    assert!(!entry.is_stale());
}

/// Tests that flipping any bit before the end of the checksum suppresses the update.
#[test]
fn test_any_corruption_suppresses_update() {
    let checked = SHORT_TELEGRAM.len() - 2;
    for i in 0..checked {
        for bit in [0x01u8, 0x10] {
            let mut wire = SHORT_TELEGRAM.to_vec();
            wire[i] ^= bit;

            let mut dispatcher = dispatcher_with(&[("1-0:1.8.0", "energy")]);
            let outcome = dispatcher.feed(&wire, Instant::now());
            assert!(
                outcome.events.is_empty(),
                "byte {i} ^ {bit:#04x} produced {:?}",
                outcome.events
            );
            let entry = dispatcher.registry().get("1-0:1.8.0").unwrap();
            assert!(entry.is_stale());
            assert_eq!(entry.last_value(), None);
        }
    }
}

/// Tests that a rejected telegram leaves previously cached values untouched.
#[test]
fn test_mismatch_keeps_previous_state() {
    let mut dispatcher = dispatcher_with(&[("1-0:1.8.0", "energy")]);
    let t0 = Instant::now();
    dispatcher.feed(SHORT_TELEGRAM, t0);

    let corrupted = b"/ISk5\\2MT382-1000\r\n1-0:1.8.0(99999.999*kWh)\r\n!CD4E\r\n";
    let outcome = dispatcher.feed(corrupted, t0 + Duration::from_secs(1));

    assert!(matches!(
        outcome.faults[..],
        [DsmrError::ChecksumMismatch { expected: 0xCD4E, .. }]
    ));
    assert!(outcome.events.is_empty());
    let entry = dispatcher.registry().get("1-0:1.8.0").unwrap();
    assert_eq!(entry.last_value(), Some(123.456));
    assert_eq!(entry.last_update(), Some(t0));
    assert_eq!(dispatcher.stats().checksum_mismatches, 1);
    assert_eq!(dispatcher.stats().telegrams_valid, 1);
}

/// Tests decoding of a full DSMR 5 telegram into a dashboard's bindings.
#[test]
fn test_dsmr5_telegram_values() {
    let mut dispatcher = dispatcher_with(DASHBOARD_SENSORS);
    let outcome = dispatcher.feed(DSMR5_TELEGRAM, Instant::now());
    assert_eq!(outcome.telegrams, 1);

    assert_eq!(value_of(&dispatcher, "1-0:1.8.1"), Some((123456.789, "kWh".into())));
    assert_eq!(value_of(&dispatcher, "1-0:1.7.0"), Some((1.193, "kW".into())));
    assert_eq!(value_of(&dispatcher, "1-0:32.7.0"), Some((220.1, "V".into())));
    assert_eq!(value_of(&dispatcher, "1-0:31.7.0"), Some((1.0, "A".into())));
    assert_eq!(value_of(&dispatcher, "0-0:96.14.0"), Some((2.0, String::new())));
    // Capture timestamp in the first group, reading in the last
    assert_eq!(value_of(&dispatcher, "0-1:24.2.1"), Some((12785.123, "m3".into())));

    assert!(dispatcher.snapshot().iter().all(|s| !s.stale));
    let stats = dispatcher.stats();
    assert_eq!(stats.lines_decoded, 23);
    assert_eq!(stats.updates_applied, DASHBOARD_SENSORS.len() as u64);
}

/// Tests that codes without a binding never affect any cache entry.
#[test]
fn test_unknown_codes_isolated() {
    let mut dispatcher = dispatcher_with(&[("1-0:99.99.9", "unused")]);
    let outcome = dispatcher.feed(DSMR5_TELEGRAM, Instant::now());

    assert_eq!(outcome.telegrams, 1);
    assert!(outcome.events.is_empty());
    let entry = dispatcher.registry().get("1-0:99.99.9").unwrap();
    assert!(entry.is_stale());
    assert_eq!(entry.last_value(), None);
    assert!(dispatcher.stats().unknown_codes > 0);
}

/// Tests that a telegram without any bound code is still counted as valid.
#[test]
fn test_no_bindings() {
    let mut dispatcher = dispatcher_with(&[]);
    let outcome = dispatcher.feed(SHORT_TELEGRAM, Instant::now());
    assert_eq!(outcome.telegrams, 1);
    assert!(dispatcher.snapshot().is_empty());
}

/// Tests staleness after the validity window and recovery on the next telegram.
#[test]
fn test_staleness_and_recovery() {
    let mut dispatcher = dispatcher_with(&[("1-0:1.8.0", "energy")]);
    let t0 = Instant::now();
    dispatcher.feed(SHORT_TELEGRAM, t0);

    for ms in (500..=10_000).step_by(500) {
        assert!(dispatcher.tick(t0 + Duration::from_millis(ms)).is_empty());
    }
    let events = dispatcher.tick(t0 + Duration::from_millis(10_500));
    assert_eq!(
        events,
        vec![SensorEvent::Stale {
            channel: "energy".into(),
            stale: true
        }]
    );
    assert_eq!(dispatcher.snapshot()[0].value, None);

    let outcome = dispatcher.feed(SHORT_TELEGRAM, t0 + Duration::from_secs(11));
    assert_eq!(
        outcome.events[0],
        SensorEvent::Stale {
            channel: "energy".into(),
            stale: false
        }
    );
    assert_eq!(dispatcher.snapshot()[0].value, Some(123.456));
}

/// Tests that a zero validity window keeps values current indefinitely.
#[test]
fn test_zero_validity_window() {
    let mut dispatcher = Dispatcher::new(Duration::ZERO, 4096);
    dispatcher.register("1-0:1.8.0", "energy".into()).unwrap();
    let t0 = Instant::now();
    dispatcher.feed(SHORT_TELEGRAM, t0);
    assert!(dispatcher.tick(t0 + Duration::from_secs(86_400)).is_empty());
    assert!(!dispatcher.registry().get("1-0:1.8.0").unwrap().is_stale());
}

/// Tests overflow reporting and recovery on the next well-formed telegram.
#[test]
fn test_overflow_recovery() {
    let mut dispatcher = Dispatcher::new(Duration::from_secs(10), 256);
    dispatcher.register("1-0:1.8.0", "energy".into()).unwrap();

    let mut body = b"/ISk5\\2MT382-1000\r\n".to_vec();
    for i in 0..40 {
        body.extend_from_slice(format!("0-0:96.13.{i}(00)\r\n").as_bytes());
    }
    let mut stream = seal_telegram(&body);
    stream.extend_from_slice(SHORT_TELEGRAM);

    let now = Instant::now();
    let mut faults = Vec::new();
    let mut events = Vec::new();
    for chunk in stream.chunks(64) {
        let outcome = dispatcher.feed(chunk, now);
        faults.extend(outcome.faults);
        events.extend(outcome.events);
        assert!(dispatcher.framer().buffered_len() <= 256);
    }

    assert!(matches!(
        faults[..],
        [DsmrError::FramingFault(FramingFaultKind::Overflow { limit: 256 })]
    ));
    assert_eq!(events.len(), 2);
    assert_eq!(value_of(&dispatcher, "1-0:1.8.0"), Some((123.456, "kWh".into())));
    assert_eq!(dispatcher.stats().framing_faults, 1);
}

/// Tests that several telegrams in one chunk are all applied in order.
#[test]
fn test_multiple_telegrams_per_feed() {
    let mut dispatcher = dispatcher_with(&[("1-0:1.8.0", "energy")]);
    let mut stream = seal_telegram(b"/ISk5\\2MT382-1000\r\n1-0:1.8.0(1.000*kWh)\r\n");
    stream.extend_from_slice(&seal_telegram(b"/ISk5\\2MT382-1000\r\n1-0:1.8.0(2.000*kWh)\r\n"));

    let outcome = dispatcher.feed(&stream, Instant::now());
    assert_eq!(outcome.telegrams, 2);
    assert_eq!(value_of(&dispatcher, "1-0:1.8.0"), Some((2.0, "kWh".into())));
    assert_eq!(dispatcher.stats().telegrams_seen, 2);
}
