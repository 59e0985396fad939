//! Structured logging.
//!
//! The build and service commands install the subscriber. Builds also report
//! progress through `log_status!`; warnings such as a failed cleanup and
//! everything the unattended services emit go through `tracing`.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_ENV: &str = "SHOWCASE_LOG";

const DEFAULT_DIRECTIVES: &str = "info,tower_http=info";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber once. Later calls are no-ops.
///
/// Filter directives come from `SHOWCASE_LOG` (e.g. `debug`,
/// `showcase=debug,tower_http=warn`) and default to `info`.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_filter(filter),
        );

        // Another subscriber (e.g. a test harness) may already be installed.
        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }
    });
}
