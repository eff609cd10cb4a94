//! Tracing subscriber initialisation

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, one line per event
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install the global subscriber, filtering by `RUST_LOG`
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init(format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter, format)
}

/// Install the global subscriber with an explicit filter directive
pub fn init_with_filter(directives: &str, format: LogFormat) -> bool {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|err| {
        tracing::warn!(%directives, error = %err, "Invalid log filter, using default");
        EnvFilter::new(DEFAULT_FILTER)
    });
    install(filter, format)
}

fn install(filter: EnvFilter, format: LogFormat) -> bool {
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    };
    installed.is_ok()
}
