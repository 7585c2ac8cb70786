//! Structured logging infrastructure for Dactylos.
//!
//! Centralized logging initialization for UI shells embedding the
//! authentication core, with human-readable and JSON output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter applied when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system with structured output.
///
/// Log level can be configured via the `RUST_LOG` environment variable.
/// If not set, defaults to `info` level.
///
/// # Example
/// ```no_run
/// use dactylos_core::logging;
///
/// logging::init();
/// tracing::info!("Shell started");
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

/// Initialize the logging system with JSON output.
///
/// Same filtering rules as [`init`].
///
/// # Example
/// ```no_run
/// use dactylos_core::logging;
///
/// logging::init_json();
/// tracing::info!(component = "session", "Session ready");
/// ```
pub fn init_json() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_target(true).with_thread_ids(true))
        .init();
}

/// Like [`init`], but returns `false` instead of panicking when a global
/// subscriber is already installed. Useful from test harnesses.
pub fn try_init() -> bool {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(true).with_test_writer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_builds() {
        // A global subscriber can only be installed once per process, so only
        // the filter construction is exercised here.
        let _ = env_filter();
    }

    #[test]
    fn test_try_init_is_repeatable() {
        let _ = try_init();
        assert!(!try_init());
    }
}
