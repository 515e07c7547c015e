//! Telemetry and observability setup
//!
//! Configures structured logging with tracing and tracing-subscriber.

use crate::config::{LogFormat, ObservabilityConfig};
use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Filter used when `RUST_LOG` is not set
fn default_filter(level: &str) -> String {
    format!("modelgate={},tower_http=debug", level)
}

/// Initialize tracing subscriber for structured logging
///
/// Only the first call in a process has any effect. `RUST_LOG` takes
/// precedence over `config.log_level`.
///
/// # Examples
///
/// ```no_run
/// use modelgate::config::ObservabilityConfig;
///
/// modelgate::telemetry::init(&ObservabilityConfig::default());
/// tracing::info!("Application started");
/// ```
pub fn init(config: &ObservabilityConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));

        let registry = tracing_subscriber::registry().with(filter);
        match config.log_format {
            LogFormat::Full => registry.with(tracing_subscriber::fmt::layer()).init(),
            LogFormat::Compact => registry
                .with(tracing_subscriber::fmt::layer().compact())
                .init(),
        }
    });
}
