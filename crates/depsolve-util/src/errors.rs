use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for depsolve operations outside the resolver itself.
///
/// Resolution failures have their own typed error in `depsolve-resolver`;
/// this covers everything around it.
#[derive(Debug, Error, Diagnostic)]
pub enum DepsolveError {
    /// Invalid or malformed resolver configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the [resolver] table for unknown keys or wrong value types"))]
    Config { message: String },

    /// A dependency provider (version listing, reference lookup, dependency
    /// listing) failed.
    #[error("Provider error: {message}")]
    Provider { message: String },

    /// Logging could not be initialised.
    #[error("Logging error: {message}")]
    Logging { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type DepsolveResult<T> = miette::Result<T>;
