//! Backtracking dependency-version resolution.
//!
//! Given the version requirements of a project, a previously pinned
//! assignment and the names eligible for update, [`resolver::Resolver`]
//! picks the newest version of every reachable dependency that satisfies
//! every requirement placed on it, exploring alternatives depth-first and
//! backtracking on conflicts. Versions and transitive requirements come from
//! a [`retriever::DependencyProvider`].

pub mod backtrack;
pub mod cache;
pub mod error;
pub mod graph;
pub mod rejection;
pub mod resolver;
pub mod retriever;
pub mod state;
pub mod version;
pub mod version_set;
