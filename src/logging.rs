use log::{info, log_enabled, Level};

/// Initializes the logger with the `env_logger` crate.
///
/// The level comes from `RUST_LOG`; `dsmr_rs=debug` shows the rotating
/// window of raw telegram lines.
pub fn init_logger() {
    env_logger::init();
}

/// Initializes the logger with a default filter used when `RUST_LOG` is unset.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logger_with_default(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}
