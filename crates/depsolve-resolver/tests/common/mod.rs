//! In-memory dependency provider that records every call.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use depsolve_core::dependency::Dependency;
use depsolve_resolver::retriever::{DependencyEntry, DependencyProvider};
use depsolve_resolver::version::{PinnedVersion, VersionSpecifier};
use depsolve_util::errors::{DepsolveError, DepsolveResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListVersions(String),
    ResolveReference(String, String),
    ListDependencies(String, String),
}

#[derive(Default)]
pub struct StubProvider {
    versions: HashMap<String, Vec<PinnedVersion>>,
    references: HashMap<(String, String), PinnedVersion>,
    dependencies: HashMap<(String, String), Vec<DependencyEntry>>,
    failing: HashSet<String>,
    calls: RefCell<Vec<Call>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `versions` of `name`, in the order given.
    pub fn versions(mut self, name: &str, versions: &[&str]) -> Self {
        self.versions.insert(
            name.to_string(),
            versions.iter().map(|v| PinnedVersion::new(*v)).collect(),
        );
        self
    }

    pub fn reference(mut self, name: &str, reference: &str, resolved: &str) -> Self {
        self.references.insert(
            (name.to_string(), reference.to_string()),
            PinnedVersion::new(resolved),
        );
        self
    }

    /// Declare what `name` at `version` requires.
    pub fn requires(mut self, name: &str, version: &str, deps: &[(&str, &str)]) -> Self {
        self.dependencies.insert(
            (name.to_string(), version.to_string()),
            deps.iter().map(|(n, s)| (dep(n), spec(s))).collect(),
        );
        self
    }

    /// Make every call about `name` fail.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn version_listings(&self) -> usize {
        self.count(|c| matches!(c, Call::ListVersions(_)))
    }

    pub fn version_listings_for(&self, name: &str) -> usize {
        self.count(|c| matches!(c, Call::ListVersions(n) if n == name))
    }

    pub fn reference_resolutions(&self) -> usize {
        self.count(|c| matches!(c, Call::ResolveReference(..)))
    }

    pub fn dependency_listings(&self) -> usize {
        self.count(|c| matches!(c, Call::ListDependencies(..)))
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    fn check(&self, dependency: &Dependency) -> DepsolveResult<()> {
        if self.failing.contains(&dependency.name) {
            return Err(DepsolveError::Provider {
                message: format!("{} is unreachable", dependency.name),
            }
            .into());
        }
        Ok(())
    }
}

impl DependencyProvider for StubProvider {
    fn list_versions(&self, dependency: &Dependency) -> DepsolveResult<Vec<PinnedVersion>> {
        self.calls
            .borrow_mut()
            .push(Call::ListVersions(dependency.name.clone()));
        self.check(dependency)?;
        Ok(self
            .versions
            .get(&dependency.name)
            .cloned()
            .unwrap_or_default())
    }

    fn resolve_reference(
        &self,
        dependency: &Dependency,
        reference: &str,
    ) -> DepsolveResult<PinnedVersion> {
        self.calls.borrow_mut().push(Call::ResolveReference(
            dependency.name.clone(),
            reference.to_string(),
        ));
        self.check(dependency)?;
        self.references
            .get(&(dependency.name.clone(), reference.to_string()))
            .cloned()
            .ok_or_else(|| {
                DepsolveError::Provider {
                    message: format!("unknown reference {reference} of {}", dependency.name),
                }
                .into()
            })
    }

    fn list_dependencies(
        &self,
        dependency: &Dependency,
        version: &PinnedVersion,
    ) -> DepsolveResult<Vec<DependencyEntry>> {
        self.calls.borrow_mut().push(Call::ListDependencies(
            dependency.name.clone(),
            version.to_string(),
        ));
        self.check(dependency)?;
        Ok(self
            .dependencies
            .get(&(dependency.name.clone(), version.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

pub fn dep(name: &str) -> Dependency {
    Dependency::github(format!("test/{name}"))
}

pub fn spec(s: &str) -> VersionSpecifier {
    s.parse().unwrap()
}

pub fn requirements(entries: &[(&str, &str)]) -> BTreeMap<Dependency, VersionSpecifier> {
    entries.iter().map(|(n, s)| (dep(n), spec(s))).collect()
}

pub fn pins(entries: &[(&str, &str)]) -> BTreeMap<Dependency, PinnedVersion> {
    entries
        .iter()
        .map(|(n, v)| (dep(n), PinnedVersion::new(*v)))
        .collect()
}

pub fn names(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// `name -> version` view of a resolution, for terse assertions.
pub fn by_name(resolved: &BTreeMap<Dependency, PinnedVersion>) -> BTreeMap<String, String> {
    resolved
        .iter()
        .map(|(d, v)| (d.name.clone(), v.to_string()))
        .collect()
}

pub fn expected(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect()
}
