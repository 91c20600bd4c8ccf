//! Resolution errors.

use std::fmt;

use depsolve_core::dependency::Dependency;
use miette::Diagnostic;
use thiserror::Error;

use crate::version::VersionSpecifier;
use crate::version_set::DependencySpec;

/// One side of an incompatibility: a specifier and who declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequirement {
    pub specifier: VersionSpecifier,
    /// `None` for a requirement declared by the root project.
    pub from: Option<Dependency>,
}

impl From<&DependencySpec> for VersionRequirement {
    fn from(spec: &DependencySpec) -> Self {
        Self {
            specifier: spec.specifier.clone(),
            from: spec.parent.clone(),
        }
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.from {
            Some(parent) => write!(f, "{} (required by {parent})", self.specifier),
            None => write!(f, "{} (required by the root project)", self.specifier),
        }
    }
}

/// Why a resolve call, or a single search branch, failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ResolveError {
    /// The search ran out of candidates without pinning down a specific conflict.
    #[error("Unable to resolve dependencies: {}", .names.join(", "))]
    #[diagnostic(
        code(depsolve::unresolved),
        help("Relax the version requirements of the listed dependencies")
    )]
    UnresolvedDependencies { names: Vec<String> },

    /// No available version of an updatable dependency satisfies its specifier.
    #[error("No available version of {dependency} satisfies {specifier}")]
    #[diagnostic(code(depsolve::version_not_found))]
    RequiredVersionNotFound {
        dependency: Dependency,
        specifier: VersionSpecifier,
    },

    /// Two requirements on the same dependency have no version in common.
    #[error(
        "Could not pick a version for {dependency}, due to mutually incompatible requirements:\n\t{existing}\n\t{new}"
    )]
    #[diagnostic(code(depsolve::incompatible))]
    IncompatibleRequirements {
        dependency: Dependency,
        existing: VersionRequirement,
        new: VersionRequirement,
    },

    /// Narrowing failed but no single prior requirement is to blame.
    #[error("Unable to satisfy the dependency list for: {}", .names.join(", "))]
    #[diagnostic(code(depsolve::unsatisfiable))]
    UnsatisfiableDependencyList { names: Vec<String> },

    /// A dependency provider failed.
    #[error("Internal error: {description}")]
    #[diagnostic(code(depsolve::internal))]
    Internal { description: String },
}

impl ResolveError {
    /// Errors that abort the whole resolve call instead of one branch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    pub(crate) fn internal(context: impl fmt::Display, error: impl fmt::Display) -> Self {
        Self::Internal {
            description: format!("{context}: {error}"),
        }
    }
}

/// A version specifier string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("Invalid version specifier '{input}': {reason}")]
#[diagnostic(help("Use `== 1.2.3`, `>= 1.2.3`, `~> 1.2.3`, `*` or a quoted git reference"))]
pub struct SpecifierParseError {
    pub input: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(name: &str) -> Dependency {
        Dependency::github(format!("test/{name}"))
    }

    #[test]
    fn incompatible_message_names_both_origins() {
        let err = ResolveError::IncompatibleRequirements {
            dependency: dep("Core"),
            existing: VersionRequirement {
                specifier: "~> 1.0".parse().unwrap(),
                from: None,
            },
            new: VersionRequirement {
                specifier: "~> 2.0".parse().unwrap(),
                from: Some(dep("Plugin")),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("Could not pick a version for Core"));
        assert!(msg.contains("~> 1.0.0 (required by the root project)"));
        assert!(msg.contains("~> 2.0.0 (required by Plugin)"));
    }

    #[test]
    fn unresolved_lists_names() {
        let err = ResolveError::UnresolvedDependencies {
            names: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(err.to_string(), "Unable to resolve dependencies: A, B");
    }

    #[test]
    fn only_internal_is_fatal() {
        assert!(ResolveError::Internal {
            description: "boom".to_string()
        }
        .is_fatal());
        assert!(!ResolveError::UnsatisfiableDependencyList {
            names: vec!["A".to_string()]
        }
        .is_fatal());
    }

    #[test]
    fn version_not_found_message() {
        let err = ResolveError::RequiredVersionNotFound {
            dependency: dep("Net"),
            specifier: ">= 3.0".parse().unwrap(),
        };
        assert_eq!(err.to_string(), "No available version of Net satisfies >= 3.0.0");
    }
}
