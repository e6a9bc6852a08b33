//! Tracing/logging initialization.
//!
//! Filtered by `RUST_LOG` (default `info`). Authentication rejections are
//! emitted at `debug`; enable them with
//! `RUST_LOG=cleanops_auth=debug,cleanops_api=debug`.
//!
//! `CLEANOPS_LOG_FORMAT` picks the line format: `json` (default) or `compact`
//! for local runs.

use tracing_subscriber::EnvFilter;

pub const ENV_LOG_FORMAT: &str = "CLEANOPS_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Compact,
}

impl LogFormat {
    /// Unknown values fall back to JSON.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("compact") => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let format = LogFormat::from_env_value(std::env::var(ENV_LOG_FORMAT).ok().as_deref());
    init_with(format);
}

pub fn init_with(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let _ = match format {
        LogFormat::Json => builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
}
