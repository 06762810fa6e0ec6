//! Logging setup using `tracing-subscriber`
//!
//! Logs go to stderr so stdout stays free for results.
//!
//! - `error`: fatal run failures
//! - `warn`: org units skipped after a failed fetch
//! - `info`: run start and finish with counts
//! - `debug`: per rule, period and attribute combo decisions (`-v`)
//! - `trace`: expression evaluation (`-vv`)
//!
//! `RUST_LOG` overrides the level picked from `-v`.

use anyhow::Result;
use clap::ValueEnum;
use std::io;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line human-readable output
    #[default]
    Pretty,
    /// Single-line output
    Compact,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::default(),
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// - 0: warn
    /// - 1 (`-v`): info
    /// - 2 (`-vv`): debug
    /// - 3+: trace
    #[must_use]
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            level,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(self.level).into())
            .from_env_lossy()
    }
}

/// Install the global subscriber; fails if one is already installed
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = config.env_filter();
    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()?,
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .without_time()
                    .with_ansi(config.with_ansi)
                    .with_writer(io::stderr),
            )
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .without_time()
                    .with_ansi(config.with_ansi)
                    .with_writer(io::stderr),
            )
            .try_init()?,
    }
    Ok(())
}
