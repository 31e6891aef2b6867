#![no_main]

use libfuzzer_sys::fuzz_target;
use dsmr_rs::p1::TelegramFramer;
use dsmr_rs::Dispatcher;
use std::time::{Duration, Instant};

fuzz_target!(|data: &[u8]| {
    // First byte picks the chunk size so split points vary too
    let Some((&split, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(split).max(1);

    let mut framer = TelegramFramer::with_max_len(512);
    let mut chunked = Vec::new();
    for piece in stream.chunks(chunk) {
        chunked.extend(framer.feed(piece));
        assert!(framer.buffered_len() <= 512);
    }
    let whole = TelegramFramer::with_max_len(512).feed(stream);
    assert_eq!(chunked, whole);

    let mut dispatcher = Dispatcher::new(Duration::from_secs(10), 512);
    let _ = dispatcher.register("1-0:1.8.1", "energy".into());
    let _ = dispatcher.feed(stream, Instant::now());
});
