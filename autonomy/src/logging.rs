//! Diagnostics via `tracing`.
//!
//! Mission replies and JSON output go to stdout; everything logged here goes
//! to stderr so the two never mix.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// Reads `RUST_LOG`, defaulting to `warn` so injection flags and blocked
/// tools are visible without configuration. Compact format on stderr.
///
/// # Example
/// ```bash
/// RUST_LOG=autonomy=debug autonomy handle --actor alice --message "auto1: check status"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
