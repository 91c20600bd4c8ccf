//! Core data types for depsolve.
//!
//! This crate defines the caller-owned values the resolver works with:
//! dependency identities and their sources, plus the resolver configuration.
//!
//! This crate is intentionally free of network and file I/O.

pub mod config;
pub mod dependency;
