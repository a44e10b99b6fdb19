//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "roamrun=info";

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `roamrun=info`. Returns false if a global subscriber was already set.
pub fn init() -> bool {
    init_with(DEFAULT_DIRECTIVE)
}

pub fn init_with(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
