//! Logging bootstrap.
//!
//! Hafiz itself only emits `tracing` events. Binaries and tests that
//! want to see them call [`init`] once.

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "hafiz=info,hafiz_core=info";

/// Installs a global fmt subscriber filtered by `RUST_LOG`, falling
/// back to `fallback`.
///
/// Returns `false` if a global subscriber was already installed.
/// Safe to call from every test.
pub fn init(fallback: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .try_init()
        .is_ok()
}

/// [`init`] with [`DEFAULT_DIRECTIVE`].
pub fn init_default() -> bool {
    init(DEFAULT_DIRECTIVE)
}
