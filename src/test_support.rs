//! Shared test-only setup. Not part of the public API.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes a `tracing_subscriber::fmt` subscriber once per test binary, so `trace!`/`debug!`
/// output from the encoder and decoder is visible when a test is run with `--nocapture` or fails.
pub(crate) fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}
