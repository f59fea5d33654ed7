//! Tracing/logging initialization shared by every Sekai binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

/// Initialise the global tracing subscriber.
///
/// `RUST_LOG` wins over `log.filter` when set. With `log.json` the output is
/// one structured JSON object per line, for log aggregation.
pub fn init_tracing(log: &LogConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log.filter));
    let registry = tracing_subscriber::registry().with(env_filter);

    if log.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}
