//! Common test utilities.
//!
//! - [`app`] - The demo "widgets" application the harness is exercised
//!   against, plus its list fixture.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

pub mod app;

static TRACING: Once = Once::new();

/// Installs a tracing subscriber once per test binary; `RUST_LOG` controls
/// verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
