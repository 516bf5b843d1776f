//! Tracing subscriber setup for the CLI.
//!
//! Logs go to stderr so stdout stays clean for values, packages and
//! transport records that scripts pipe elsewhere.

use tracing_subscriber::EnvFilter;

use crate::errors::{CryptStoreError, Result};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `log_level` is used as the filter.
///
/// # Errors
///
/// Returns an error if a subscriber has already been installed.
pub fn init(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| CryptStoreError::ConfigError(format!("failed to initialise logging: {e}")))
}
