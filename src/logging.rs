//! Logging initialisation for binary callers and integration tests.
//!
//! The engine itself only emits `tracing` events; installing a subscriber is
//! the embedding application's choice.

use tracing_subscriber::EnvFilter;

/// Install a human-readable `fmt` subscriber honouring `RUST_LOG`.
///
/// Safe to call more than once — subsequent calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
