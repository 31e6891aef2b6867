//! # dsmr-rs - A Rust Crate for reading DSMR P1 smart meter telegrams
//!
//! Dutch and Belgian smart meters (DSMR 2.2 through 5.x, eMUCS) push a text
//! telegram over their P1 port every one to ten seconds. Each telegram starts
//! with a `/` identification line, carries one OBIS record per line such as
//! `1-0:1.8.1(000123.456*kWh)`, and ends with `!` followed by a CRC-16.
//!
//! ## Features
//!
//! - Incremental telegram framing from arbitrarily chunked serial input, with a
//!   hard size bound and recovery after corrupt or truncated telegrams
//! - CRC-16/ARC validation; a telegram that fails it never reaches the cache
//! - OBIS line decoding with `nom`, tolerant of multi-group records such as gas
//!   readings with a capture timestamp
//! - A registry mapping OBIS codes to output channels, with a validity window
//!   that marks values stale once the meter stops reporting them
//! - A `tokio` driver loop, serial adapter, JSON configuration and output sinks
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! dsmr-rs = "1.0.0"
//! ```
//!
//! ```rust
//! use dsmr_rs::{Dispatcher, SensorEvent};
//! use std::time::{Duration, Instant};
//!
//! let mut dispatcher = Dispatcher::new(Duration::from_secs(10), 4096);
//! dispatcher.register("1-0:1.8.0", "energy_delivered".into()).unwrap();
//!
//! // Bytes may arrive in any split
//! let now = Instant::now();
//! dispatcher.feed(b"/ISk5\\2MT382-1000\r\n1-0:1.8.0(00123", now);
//! let outcome = dispatcher.feed(b".456*kWh)\r\n!CD4E\r\n", now);
//!
//! assert!(matches!(
//!     outcome.events.last(),
//!     Some(SensorEvent::Value { value, .. }) if *value == 123.456
//! ));
//! ```

pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod p1;
pub mod registry;
pub mod runner;
pub mod sink;
pub mod util;

pub use crate::error::{DsmrError, FramingFaultKind};
pub use crate::logging::{init_logger, log_info};

pub use config::{P1Config, SensorConfig};
pub use dispatcher::{Dispatcher, DispatcherStats, FeedOutcome};
pub use p1::{FrameEvent, ObisLine, ObisValue, P1Port, SerialConfig, Telegram, TelegramFramer};
pub use registry::{Channel, SensorEvent, SensorRegistry, SensorState};
pub use runner::RunSummary;
pub use sink::{JsonLinesSink, LogSink, MemorySink, SensorSink};

/// Open the P1 port described by `config`.
pub async fn connect(config: &SerialConfig) -> Result<P1Port, DsmrError> {
    P1Port::connect_with_config(config.clone()).await
}

/// Read from the configured port until it closes, publishing to `sink`.
///
/// # Returns
/// * `Ok(RunSummary)` - The port reached end of stream
/// * `Err(DsmrError)` - Invalid configuration, or the port failed
pub async fn listen<S: SensorSink + ?Sized>(
    config: &P1Config,
    sink: &mut S,
) -> Result<RunSummary, DsmrError> {
    let mut dispatcher = Dispatcher::from_config(config)?;
    let port = connect(&config.serial).await?;
    runner::run(
        port.into_inner(),
        &mut dispatcher,
        config.update_interval(),
        sink,
    )
    .await
}
