//! Logging setup for fedgate.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize structured logging.
///
/// Honors `RUST_LOG`, falling back to `default_level` (e.g. "info").
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
