//! Tracing setup.
//!
//! Console output goes to stderr and respects `RUST_LOG` (default `warn`). A debug-level log
//! also rolls daily under `$SENKO_HOME/logs/senko.log`.

use std::fs;

use senko_core::config::paths;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

pub fn init() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(console_filter);

    let logs_dir = paths::logs_dir();
    let file_layer = match fs::create_dir_all(&logs_dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(&logs_dir, "senko.log");
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        Err(e) => {
            eprintln!(
                "Warning: Could not initialize file logging in {}: {e}",
                logs_dir.display()
            );
            None
        }
    };

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
