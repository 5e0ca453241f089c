//! Tracing initialisation

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Build the filter: `RUST_LOG` if set and valid, [`DEFAULT_FILTER`]
/// otherwise
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global fmt subscriber. Returns `false` if a subscriber was
/// already installed.
pub fn init_tracing(format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());
    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.is_ok()
}
