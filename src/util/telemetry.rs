//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset: scheduler decisions at info.
const DEFAULT_FILTER: &str = "job_admission=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, unless the embedder has
/// already installed one. Safe to call repeatedly.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
