//! # Driver Loop
//!
//! Async loop that feeds a byte stream into a [`Dispatcher`] and runs its
//! periodic tick. Reads and ticks are multiplexed with `tokio::select!` on a
//! single task, so the dispatcher is never entered twice at once.
//!
//! ```rust,no_run
//! use dsmr_rs::{config::P1Config, dispatcher::Dispatcher, p1::P1Port, runner, sink::LogSink};
//!
//! # async fn example() -> Result<(), dsmr_rs::DsmrError> {
//! let config = P1Config::load("p1.json")?;
//! let mut dispatcher = Dispatcher::from_config(&config)?;
//! let port = P1Port::connect_with_config(config.serial.clone()).await?;
//! let interval = config.update_interval();
//! let summary = runner::run(port.into_inner(), &mut dispatcher, interval, &mut LogSink).await?;
//! println!("{} telegrams", summary.dispatcher.telegrams_valid);
//! # Ok(())
//! # }
//! ```

use bytes::BytesMut;
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::constants::RAW_BUFFER_RESERVE;
use crate::dispatcher::{Dispatcher, DispatcherStats};
use crate::error::DsmrError;
use crate::registry::SensorEvent;
use crate::sink::SensorSink;

/// What a [`run`] call did before the stream ended
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub reads: u64,
    pub bytes_read: u64,
    pub ticks: u64,
    pub events_published: u64,
    pub dispatcher: DispatcherStats,
}

/// Drive `dispatcher` from `reader` until end of stream.
///
/// Every read is fed as soon as it completes; every `tick_interval` the
/// registry is swept and the sink receives the resulting transitions followed
/// by a full snapshot. Read and sink errors end the loop.
pub async fn run<R, S>(
    mut reader: R,
    dispatcher: &mut Dispatcher,
    tick_interval: Duration,
    sink: &mut S,
) -> Result<RunSummary, DsmrError>
where
    R: AsyncRead + Unpin,
    S: SensorSink + ?Sized,
{
    let mut buf = BytesMut::with_capacity(RAW_BUFFER_RESERVE);
    // interval() rejects a zero period
    let tick_interval = tick_interval.max(Duration::from_millis(1));
    let mut ticker = time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = RunSummary::default();

    log::info!("P1 reader started, tick every {} ms", tick_interval.as_millis());

    loop {
        tokio::select! {
            read = reader.read_buf(&mut buf) => {
                let n = read?;
                if n == 0 {
                    log::info!("P1 stream closed");
                    break;
                }
                summary.reads += 1;
                summary.bytes_read += n as u64;

                let outcome = dispatcher.feed(&buf, Instant::now().into_std());
                buf.clear();
                for fault in &outcome.faults {
                    log::trace!("Telegram dropped: {fault}");
                }
                publish_all(sink, &outcome.events, &mut summary)?;
            }
            at = ticker.tick() => {
                summary.ticks += 1;
                let events = dispatcher.tick(at.into_std());
                publish_all(sink, &events, &mut summary)?;
                sink.publish_snapshot(&dispatcher.snapshot())?;
            }
        }
    }

    summary.dispatcher = dispatcher.stats();
    log::info!(
        "P1 reader stopped: {} bytes, {} valid telegrams, {} faults",
        summary.bytes_read,
        summary.dispatcher.telegrams_valid,
        summary.dispatcher.faults()
    );
    Ok(summary)
}

fn publish_all<S: SensorSink + ?Sized>(
    sink: &mut S,
    events: &[SensorEvent],
    summary: &mut RunSummary,
) -> Result<(), DsmrError> {
    for event in events {
        sink.publish(event)?;
        summary.events_published += 1;
    }
    Ok(())
}
