//! Tracing initialisation for Agentry binaries.
//!
//! Call [`init_tracing`] once at program start. The output format comes
//! from the caller (CLI flag) or, when the caller defers, from the
//! `AGENTRY_LOG_FORMAT` environment variable (`json` or `pretty`).
//! `RUST_LOG` controls filtering as usual.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Log line format for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output.
    Pretty,
    /// Newline-delimited JSON, for log aggregation pipelines.
    Json,
}

impl LogFormat {
    /// Read the format from `AGENTRY_LOG_FORMAT`, defaulting to pretty.
    /// Unrecognised values fall back to pretty rather than erroring.
    pub fn from_env() -> Self {
        match std::env::var("AGENTRY_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Initialise the global tracing subscriber.
///
/// `level` is the default verbosity when `RUST_LOG` is not set. Safe to
/// call multiple times; only the first call takes effect (the global
/// subscriber can only be set once per process).
pub fn init_tracing(format: LogFormat, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).json())
                .try_init()
                .ok();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false))
                .try_init()
                .ok();
        }
    }
}
