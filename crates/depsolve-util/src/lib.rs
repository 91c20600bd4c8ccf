//! Shared utilities for depsolve.
//!
//! Cross-cutting concerns used by the other depsolve crates: the unified
//! error type and logging setup.

pub mod errors;
pub mod logging;
