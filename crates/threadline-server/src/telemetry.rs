//! Tracing subscriber setup.

use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

pub type LogHandle = reload::Handle<EnvFilter, Registry>;

/// Installs the global subscriber with `RUST_LOG`, or `info` until the
/// configuration is loaded.
pub fn init() -> LogHandle {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    handle
}

/// Switches to the configured level unless `RUST_LOG` was given.
pub fn apply_config_level(handle: &LogHandle, level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }

    match EnvFilter::try_new(level) {
        Ok(filter) => {
            if let Err(e) = handle.reload(filter) {
                warn!("Failed to apply logging.level '{}': {}", level, e);
            }
        }
        Err(e) => warn!("Invalid logging.level '{}': {}", level, e),
    }
}
