//! Tracing subscriber setup.
//!
//! `RUST_LOG` takes precedence over the `[logging] level` setting:
//! ```bash
//! RUST_LOG=lantros=debug,tower_http=debug lantros serve
//! ```

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::models::LoggingConfig;

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is unset. `verbose` raises our own crate to debug.
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    let level = config.level.trim();
    let level = if level.is_empty() { "info" } else { level };
    if verbose {
        format!("{level},lantros=debug")
    } else {
        level.to_string()
    }
}

/// Install the global subscriber. Only the first call takes effect.
///
/// Logs go to stderr so `--format json` output on stdout stays parseable.
pub fn init_with_config(config: &LoggingConfig, verbose: bool) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directive(config, verbose))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}
