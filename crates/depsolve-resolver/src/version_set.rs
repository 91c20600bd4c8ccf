//! Ordered candidate sets and requirement attribution.

use std::cmp::Ordering;
use std::fmt;

use depsolve_core::dependency::Dependency;

use crate::version::{compare, ConcreteVersion, VersionSpecifier};

/// Who asked for what: a specifier together with the dependency that
/// declared it (`None` for the root project).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub parent: Option<Dependency>,
    pub specifier: VersionSpecifier,
}

impl DependencySpec {
    pub fn new(parent: Option<Dependency>, specifier: VersionSpecifier) -> Self {
        Self { parent, specifier }
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{} from {parent}", self.specifier),
            None => write!(f, "{} from root", self.specifier),
        }
    }
}

/// The versions still under consideration for one dependency in one branch,
/// kept in search order (see [`compare`]).
///
/// Mutators filter in place and never re-sort. The ones that can shrink the
/// set report whether any candidate is left.
#[derive(Debug, Clone, Default)]
pub struct ConcreteVersionSet {
    versions: Vec<ConcreteVersion>,
    specs: Vec<DependencySpec>,
    pinned_version_specifier: Option<VersionSpecifier>,
}

impl ConcreteVersionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-candidate set derived from a previously pinned version.
    pub fn pinned(version: ConcreteVersion, specifier: VersionSpecifier) -> Self {
        Self {
            versions: vec![version],
            specs: Vec::new(),
            pinned_version_specifier: Some(specifier),
        }
    }

    /// Insert in search order; later insertions lose ties. Duplicates are ignored.
    pub fn insert(&mut self, version: ConcreteVersion) -> bool {
        if self.contains(&version) {
            return false;
        }
        let at = self
            .versions
            .partition_point(|existing| compare(existing, &version) != Ordering::Greater);
        self.versions.insert(at, version);
        true
    }

    /// Drop every candidate that does not satisfy `specifier`.
    pub fn retain(&mut self, specifier: &VersionSpecifier) -> bool {
        self.versions
            .retain(|v| specifier.is_satisfied_by_concrete(v));
        !self.versions.is_empty()
    }

    /// Collapse to `version` alone.
    pub fn remove_all_except(&mut self, version: &ConcreteVersion) -> bool {
        self.versions.retain(|v| v == version);
        !self.versions.is_empty()
    }

    /// Drop exactly `version`.
    pub fn remove(&mut self, version: &ConcreteVersion) -> bool {
        if let Some(i) = self.versions.iter().position(|v| v == version) {
            self.versions.remove(i);
        }
        !self.versions.is_empty()
    }

    /// The candidate tried next.
    pub fn first(&self) -> Option<&ConcreteVersion> {
        self.versions.first()
    }

    pub fn contains(&self, version: &ConcreteVersion) -> bool {
        self.versions.contains(version)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConcreteVersion> {
        self.versions.iter()
    }

    pub fn add_spec(&mut self, spec: DependencySpec) {
        self.specs.push(spec);
    }

    /// Every requirement applied to this set, oldest first.
    pub fn specs(&self) -> &[DependencySpec] {
        &self.specs
    }

    /// Whether the set came from a pinned version rather than live retrieval.
    pub fn is_pinned(&self) -> bool {
        self.pinned_version_specifier.is_some()
    }

    pub fn pinned_version_specifier(&self) -> Option<&VersionSpecifier> {
        self.pinned_version_specifier.as_ref()
    }
}

impl fmt::Display for ConcreteVersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.versions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")?;
        if self.is_pinned() {
            f.write_str(" (pinned)")?;
        }
        Ok(())
    }
}
