//! Tracing setup for the `settingskit` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to the application.

use crate::error::{Result, SettingsError};
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_LOG_LEVEL: &str = "warn";
pub const VERBOSE_LOG_LEVEL: &str = "debug";

/// Installs a fmt subscriber writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise the level is `warn`, or `debug` when `verbose`.
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        VERBOSE_LOG_LEVEL
    } else {
        DEFAULT_LOG_LEVEL
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| SettingsError::Store(format!("failed to install tracing subscriber: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_cleanly() {
        // whichever call comes first in this process wins; the other reports an error
        let first = init_logging(false);
        let second = init_logging(true);
        assert!(first.is_err() || second.is_err());
    }
}
