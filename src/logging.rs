//! Tracing setup for test binaries.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `fmt` subscriber filtered by `RUST_LOG`
///
/// Defaults to `gateway_scaffold=info`. Every test may call this; only the
/// first call installs anything, and a subscriber installed elsewhere is left
/// alone.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "gateway_scaffold=info".into()),
            )
            .with_test_writer()
            .try_init();
    });
}
