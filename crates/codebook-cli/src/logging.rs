//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Library stages log at `info`, per-column details at `debug`. The CLI
//! prints its own results to stdout, so logs go to stderr and default to
//! `warn`.

use std::io;

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub with_timestamps: bool,
    /// Include the module path in each line.
    pub with_target: bool,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            with_timestamps: false,
            with_target: false,
            with_ansi: true,
        }
    }
}

impl LogConfig {
    /// Create a `LogConfig` from the `-v` count.
    ///
    /// - 0: warn
    /// - 1 (`-v`): info
    /// - 2 (`-vv`): debug, with module paths
    /// - 3+ (`-vvv`): trace, with module paths and timestamps
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
            with_target: verbosity >= 2,
            with_timestamps: verbosity >= 3,
            ..Default::default()
        }
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) {
    let filter = build_env_filter(config.level);
    let layer = fmt::layer()
        .compact()
        .with_writer(io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target);

    if config.with_timestamps {
        tracing_subscriber::registry().with(filter).with(layer).init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.without_time())
            .init();
    }
}

/// Build an `EnvFilter` from the given level; `RUST_LOG` takes precedence.
fn build_env_filter(level: Level) -> EnvFilter {
    let level_str = level.as_str().to_lowercase();

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Dependencies stay at warn.
        EnvFilter::new(format!("warn,codebook={level},codebook_cli={level}", level = level_str))
    })
}
