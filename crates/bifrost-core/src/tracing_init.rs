//! Tracing/logging initialization.
//!
//! Sets up `tracing_subscriber` with an env-filter, optional JSON output and
//! an optional append-only log file in place of stderr.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Logging options collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Default `RUST_LOG` value when the env-var is not set
    /// (e.g. `"bifrost_server=info"`).
    pub default_filter: String,
    /// Raise the default filter to `debug`. Ignored when `RUST_LOG` is set.
    pub debug: bool,
    /// Emit structured JSON log lines instead of the human-readable format.
    pub json: bool,
    /// Append log lines to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl LogOptions {
    fn filter(&self) -> tracing_subscriber::EnvFilter {
        let directive = std::env::var("RUST_LOG").unwrap_or_else(|_| {
            if self.debug {
                self.default_filter.replace("=info", "=debug")
            } else {
                self.default_filter.clone()
            }
        });
        tracing_subscriber::EnvFilter::new(directive)
    }
}

/// Initialise the global tracing subscriber.
///
/// Fails only when the configured log file cannot be opened.
pub fn init_tracing(options: &LogOptions) -> std::io::Result<()> {
    let env_filter = options.filter();
    let registry = tracing_subscriber::registry().with(env_filter);

    match (&options.file, options.json) {
        (Some(path), json) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            if json {
                registry.with(layer.json()).init();
            } else {
                registry.with(layer).init();
            }
        }
        (None, true) => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        (None, false) => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
    Ok(())
}
