//! `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::errors::DepsolveError;

/// Build the filter from `RUST_LOG`, falling back to `default_directive`.
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install the global fmt subscriber.
///
/// Panics if a global subscriber is already installed; use [`try_init`] where
/// that can happen (tests, embedding applications).
pub fn init(default_directive: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .init();
}

/// Like [`init`], but reports an already-installed subscriber as an error.
pub fn try_init(default_directive: &str) -> Result<(), DepsolveError> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_test_writer()
        .try_init()
        .map_err(|e| DepsolveError::Logging {
            message: e.to_string(),
        })
}
