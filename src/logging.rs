//! Logging setup for the application.

use crate::config::{AppConfig, GlobalLogLevel};
use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initializes the logger from the application settings.
///
/// If RUST_LOG is set it takes precedence; otherwise the configured global
/// level applies.
///
/// # Arguments
///
/// * `config` - The application configuration containing the log level
pub fn init_logger(config: &AppConfig) {
    let global_level = match config.log_level {
        GlobalLogLevel::Trace => LevelFilter::Trace,
        GlobalLogLevel::Debug => LevelFilter::Debug,
        GlobalLogLevel::Info => LevelFilter::Info,
        GlobalLogLevel::Warn => LevelFilter::Warn,
        GlobalLogLevel::Error => LevelFilter::Error,
    };

    let env = Env::default().filter_or("RUST_LOG", global_level.to_string());
    let mut builder = Builder::from_env(env);
    builder.init();

    log::debug!("Logger initialized with global log level: {global_level:?}");
}
