#![no_main]

use libfuzzer_sys::fuzz_target;
use dsmr_rs::p1::parse_obis_line;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    if let Ok(parsed) = parse_obis_line(&line) {
        assert!(!parsed.code.is_empty());
        assert!(!parsed.values.is_empty());
        let _ = parsed.reading();
    }
});
