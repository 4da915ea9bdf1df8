//! Diagnostic tracing for debugging the agent.
//!
//! Diagnostics go to stderr and are filtered by `RUST_LOG`; the agent
//! transcript (speaker labels, streamed replies, command output) goes to
//! stdout through [`crate::console`] and is unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=aicmd=debug aicmd "list the largest files here"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
