//! Logging configuration for podreach
//!
//! Library code only emits `tracing` events. Binaries and tests that want
//! to see them call [`init_logging`] once.
//!
//! # Example
//!
//! ```no_run
//! use podreach::telemetry::init_logging;
//!
//! init_logging();
//! // Resolution and stream events now go to stderr
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is unset or unparsable
///
/// Keeps this crate at info while the kube client's per-request events stay
/// at warn.
pub const DEFAULT_DIRECTIVES: &str = "warn,podreach=info";

/// Initialize logging to stderr with [`DEFAULT_DIRECTIVES`]
///
/// `RUST_LOG` overrides the defaults. Safe to call more than once; later
/// calls are ignored.
pub fn init_logging() {
    init_logging_with(DEFAULT_DIRECTIVES);
}

/// Initialize logging to stderr, falling back to `directives`
pub fn init_logging_with(directives: &str) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let _ = tracing_subscriber::registry()
        .with(filter(env.as_deref(), directives))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn filter(env: Option<&str>, fallback: &str) -> EnvFilter {
    env.filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}
