//! Logging and counters.
//!
//! - **Tracing**: [`init_tracing`] installs a `tracing-subscriber` formatter
//!   whose level comes from `RUST_LOG` or, failing that, the `-v` count.
//! - **Forge counters**: [`metrics::ForgeMetrics`] counts every forge API call
//!   per `(controller, token, operation)`.
//!
//! ## Usage
//!
//! ```ignore
//! use component_detector::observability::{init_tracing, LogFormat};
//!
//! fn main() {
//!     init_tracing(LogFormat::Pretty, 1);
//! }
//! ```

pub mod metrics;

pub use metrics::{CounterKey, CounterSnapshot, ForgeMetrics};

use clap::ValueEnum;
use tracing_subscriber::{fmt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LogFormat {
    /// Human readable, one event per line
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Map a `-v` count to a default filter directive.
#[must_use]
pub fn verbosity_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info,kube=warn",
        1 => "debug,kube=info,hyper=info",
        _ => "trace",
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `verbosity`. Calling this twice is harmless: the
/// second install is ignored.
pub fn init_tracing(format: LogFormat, verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_filter(verbosity)));

    let result = match format {
        LogFormat::Pretty => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("tracing subscriber already installed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_filter_levels() {
        assert!(verbosity_filter(0).starts_with("info"));
        assert!(verbosity_filter(1).starts_with("debug"));
        assert_eq!(verbosity_filter(7), "trace");
    }

    #[test]
    fn test_init_tracing_twice_does_not_panic() {
        init_tracing(LogFormat::Pretty, 0);
        init_tracing(LogFormat::Json, 2);
    }
}
