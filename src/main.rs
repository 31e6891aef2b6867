use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dsmr_rs::logging::init_logger_with_default;
use dsmr_rs::p1::{calculate_crc, FrameEvent, TelegramFramer};
use dsmr_rs::util::format_checksum;
use dsmr_rs::{
    log_info, runner, Dispatcher, JsonLinesSink, LogSink, P1Config, P1Port, SensorSink,
};

#[derive(Parser)]
#[command(name = "dsmr-cli")]
#[command(about = "CLI tool for DSMR P1 smart meter telegrams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read telegrams from a serial port until it closes
    Listen {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides the port from the configuration
        #[arg(short, long)]
        port: Option<String>,
        /// Overrides the baud rate from the configuration
        #[arg(short, long)]
        baudrate: Option<u32>,
        /// Write events as JSON lines to stdout
        #[arg(long)]
        json: bool,
    },
    /// Replay a captured byte stream through the dispatcher
    Parse {
        file: PathBuf,
        #[arg(short, long)]
        config: PathBuf,
        /// Feed the capture in chunks of this many bytes
        #[arg(long, default_value = "64")]
        chunk: usize,
        #[arg(long)]
        json: bool,
    },
    /// Print the checksum of every telegram in a capture
    Checksum { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger_with_default("info");

    let cli = Cli::parse();

    match cli.command {
        Commands::Listen {
            config,
            port,
            baudrate,
            json,
        } => {
            let mut config = load_config(&config)?;
            if let Some(port) = port {
                config.serial.port = port;
            }
            if let Some(baudrate) = baudrate {
                config.serial.baudrate = baudrate;
            }

            let mut dispatcher = Dispatcher::from_config(&config)?;
            let port = P1Port::connect_with_config(config.serial.clone())
                .await
                .with_context(|| format!("opening {}", config.serial.port))?;
            log_info(&format!(
                "Listening on {} at {} baud",
                port.config().port,
                port.config().baudrate
            ));
            let mut sink = make_sink(json);
            let summary = runner::run(
                port.into_inner(),
                &mut dispatcher,
                config.update_interval(),
                sink.as_mut(),
            )
            .await?;
            log_info(&format!(
                "Port closed after {} bytes, {} valid telegrams",
                summary.bytes_read, summary.dispatcher.telegrams_valid
            ));
        }
        Commands::Parse {
            file,
            config,
            chunk,
            json,
        } => {
            if chunk == 0 {
                bail!("--chunk must be at least 1");
            }
            let config = load_config(&config)?;
            let capture = std::fs::read(&file)
                .with_context(|| format!("reading capture {}", file.display()))?;

            let mut dispatcher = Dispatcher::from_config(&config)?;
            let mut sink = make_sink(json);
            for piece in capture.chunks(chunk) {
                let outcome = dispatcher.feed(piece, Instant::now());
                for event in &outcome.events {
                    sink.publish(event)?;
                }
            }
            sink.publish_snapshot(&dispatcher.snapshot())?;

            let stats = dispatcher.stats();
            log_info(&format!(
                "Largest telegram buffered: {} of {} bytes",
                dispatcher.framer().buffer_stats().high_water_mark,
                dispatcher.framer().max_len()
            ));
            if json {
                println!("{}", serde_json::to_string(&stats)?);
            } else {
                println!(
                    "{} telegrams, {} valid, {} checksum mismatches, {} framing faults, {} updates",
                    stats.telegrams_seen,
                    stats.telegrams_valid,
                    stats.checksum_mismatches,
                    stats.framing_faults,
                    stats.updates_applied
                );
            }
        }
        Commands::Checksum { file } => {
            let capture = std::fs::read(&file)
                .with_context(|| format!("reading capture {}", file.display()))?;
            let mut framer = TelegramFramer::new();
            let mut count = 0;
            for event in framer.feed(&capture) {
                match event {
                    FrameEvent::Complete(telegram) => {
                        count += 1;
                        let calculated = calculate_crc(telegram.raw());
                        println!(
                            "#{count} {}: {} bytes, received {} calculated {} {}",
                            telegram.identification().unwrap_or_default(),
                            telegram.raw().len(),
                            format_checksum(telegram.expected_crc()),
                            format_checksum(calculated),
                            if calculated == telegram.expected_crc() {
                                "OK"
                            } else {
                                "MISMATCH"
                            }
                        );
                    }
                    FrameEvent::Error(kind) => println!("framing fault: {kind}"),
                }
            }
            if count == 0 {
                bail!("no telegrams found in {}", file.display());
            }
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<P1Config> {
    P1Config::load(path).with_context(|| format!("loading configuration {}", path.display()))
}

fn make_sink(json: bool) -> Box<dyn SensorSink> {
    if json {
        Box::new(JsonLinesSink::new(io::stdout()))
    } else {
        Box::new(LogSink)
    }
}
