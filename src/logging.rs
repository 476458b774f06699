//! Logging setup for binaries embedding the reader.
//!
//! The library only emits `tracing` events; nothing is printed unless a
//! subscriber is installed. `init_logging` installs a compact stderr
//! subscriber so that stdout stays free for command output.

use crate::error::{Result, VpfError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `filter` takes precedence over `RUST_LOG`; without either the level is `warn`.
///
/// # Errors
///
/// Returns a configuration error for an invalid filter directive or when a
/// global subscriber is already installed.
pub fn init_logging(filter: Option<&str>) -> Result<()> {
    let env_filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| VpfError::Config(format!("invalid log filter '{}': {}", directives, e)))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| VpfError::Config(format!("logging already initialized: {}", e)))
}
