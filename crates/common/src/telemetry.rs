//! Logging initialization for test processes.
//!
//! Coordinator decisions and query executions are emitted as `tracing`
//! events. Test binaries call [`init_test_logging`] once; the filter comes from
//! `RUST_LOG` and falls back to `info`.

use std::sync::Once;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_LOG_FILTER: &str = "info";

static TEST_LOGGING: Once = Once::new();

/// Installs a global subscriber writing through the libtest capture.
///
/// Safe to call from every test; only the first call has an effect, and a
/// subscriber installed by someone else is left in place.
pub fn init_test_logging() {
    TEST_LOGGING.call_once(|| {
        let _ = build_subscriber(DEFAULT_LOG_FILTER).try_init();
    });
}

fn build_subscriber(default_filter: &str) -> impl SubscriberInitExt {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_target(true);

    tracing_subscriber::registry().with(fmt_layer.with_filter(filter))
}
