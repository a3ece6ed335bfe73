//! Logging setup: `log` records from library code are bridged into `tracing`
//! and printed by a `tracing-subscriber` fmt layer.

use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<bool> = OnceLock::new();

/// Installs the global subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Safe to call more than once; only the first call has an effect. Returns
/// whether this process ended up with our subscriber installed.
pub fn init_logging(default_filter: &str) -> bool {
    *INIT.get_or_init(|| {
        if let Err(e) = tracing_log::LogTracer::init() {
            eprintln!("log bridge already installed: {}", e);
        }

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true));

        match tracing::subscriber::set_global_default(subscriber) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("tracing subscriber already installed: {}", e);
                false
            }
        }
    })
}
