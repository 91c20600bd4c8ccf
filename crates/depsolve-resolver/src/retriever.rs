//! Access to the external collaborators, memoized per resolve call.

use std::collections::HashMap;
use std::rc::Rc;

use depsolve_core::dependency::Dependency;
use depsolve_util::errors::DepsolveResult;

use crate::cache::{ConstrainedDependency, MemoTable, PinnedDependency, VersionedDependency};
use crate::error::ResolveError;
use crate::version::{ConcreteVersion, PinnedVersion, VersionSpecifier};
use crate::version_set::ConcreteVersionSet;

/// A requirement declared by some dependency (or the root project).
pub type DependencyEntry = (Dependency, VersionSpecifier);

/// The three lookups the resolver needs from the outside world.
///
/// Every call must return the complete answer; the resolver filters and
/// orders the results itself.
pub trait DependencyProvider {
    /// All versions available for `dependency`.
    fn list_versions(&self, dependency: &Dependency) -> DepsolveResult<Vec<PinnedVersion>>;

    /// Resolve a branch, tag or partial commit to one concrete version.
    fn resolve_reference(
        &self,
        dependency: &Dependency,
        reference: &str,
    ) -> DepsolveResult<PinnedVersion>;

    /// The direct requirements declared by `dependency` at `version`.
    fn list_dependencies(
        &self,
        dependency: &Dependency,
        version: &PinnedVersion,
    ) -> DepsolveResult<Vec<DependencyEntry>>;
}

impl<P: DependencyProvider + ?Sized> DependencyProvider for &P {
    fn list_versions(&self, dependency: &Dependency) -> DepsolveResult<Vec<PinnedVersion>> {
        (**self).list_versions(dependency)
    }

    fn resolve_reference(
        &self,
        dependency: &Dependency,
        reference: &str,
    ) -> DepsolveResult<PinnedVersion> {
        (**self).resolve_reference(dependency, reference)
    }

    fn list_dependencies(
        &self,
        dependency: &Dependency,
        version: &PinnedVersion,
    ) -> DepsolveResult<Vec<DependencyEntry>> {
        (**self).list_dependencies(dependency, version)
    }
}

/// Collaborator invocations made during one resolve call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrievalStats {
    pub version_listings: usize,
    pub reference_resolutions: usize,
    pub dependency_listings: usize,
    /// Lookups answered from the version-set or dependency tables.
    pub cache_hits: usize,
    /// Branches rejected straight from the known-conflict table.
    pub conflict_hits: usize,
}

/// Memoizing front for a [`DependencyProvider`].
pub struct Retriever<'p, P: ?Sized> {
    provider: &'p P,
    pinned_versions: HashMap<Dependency, PinnedVersion>,
    versions: MemoTable<VersionedDependency, ConcreteVersionSet>,
    dependencies: MemoTable<PinnedDependency, Rc<Vec<DependencyEntry>>>,
    conflicts: MemoTable<ConstrainedDependency, ResolveError>,
    cache_conflicts: bool,
    stats: RetrievalStats,
}

impl<'p, P: DependencyProvider + ?Sized> Retriever<'p, P> {
    pub fn new(
        provider: &'p P,
        pinned_versions: HashMap<Dependency, PinnedVersion>,
        cache_conflicts: bool,
    ) -> Self {
        Self {
            provider,
            pinned_versions,
            versions: MemoTable::new(),
            dependencies: MemoTable::new(),
            conflicts: MemoTable::new(),
            cache_conflicts,
            stats: RetrievalStats::default(),
        }
    }

    /// Whether `dependency` has a previously pinned version.
    pub fn is_pinned(&self, dependency: &Dependency) -> bool {
        self.pinned_versions.contains_key(dependency)
    }

    /// The candidates for `dependency` under `specifier`, newest first.
    ///
    /// A non-updatable dependency with a pinned version yields just that
    /// version, unfiltered, without asking the provider. Otherwise the
    /// provider's full list (or the resolved reference) is filtered, and an
    /// empty result is a [`ResolveError::RequiredVersionNotFound`].
    pub fn find_all_versions(
        &mut self,
        dependency: &Dependency,
        specifier: &VersionSpecifier,
        is_updatable: bool,
    ) -> Result<ConcreteVersionSet, ResolveError> {
        let key = VersionedDependency {
            dependency: dependency.clone(),
            specifier: specifier.clone(),
            is_updatable,
        };
        let Self {
            provider,
            pinned_versions,
            versions,
            stats,
            ..
        } = self;
        let hits_before = versions.hits();
        let set = versions
            .get_or_try_insert_with(key, || {
                fetch_versions(
                    *provider,
                    pinned_versions,
                    stats,
                    dependency,
                    specifier,
                    is_updatable,
                )
            })?
            .clone();
        stats.cache_hits += versions.hits() - hits_before;

        if set.is_empty() {
            return Err(ResolveError::RequiredVersionNotFound {
                dependency: dependency.clone(),
                specifier: specifier.clone(),
            });
        }
        Ok(set)
    }

    /// The requirements declared by `dependency` at `version`.
    pub fn find_dependencies(
        &mut self,
        dependency: &Dependency,
        version: &PinnedVersion,
    ) -> Result<Rc<Vec<DependencyEntry>>, ResolveError> {
        let key = PinnedDependency {
            dependency: dependency.clone(),
            version: version.clone(),
        };
        let Self {
            provider,
            dependencies,
            stats,
            ..
        } = self;
        let hits_before = dependencies.hits();
        let entries = dependencies
            .get_or_try_insert_with(key, || {
                stats.dependency_listings += 1;
                match provider.list_dependencies(dependency, version) {
                    Ok(entries) => {
                        tracing::debug!(
                            "Dependencies for {dependency} at {version}: {}",
                            describe_entries(&entries)
                        );
                        Ok(Rc::new(entries))
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Caught error while retrieving dependencies for {dependency} at version {version}: {e}"
                        );
                        Err(ResolveError::internal(
                            format!("retrieving dependencies of {dependency} {version}"),
                            e,
                        ))
                    }
                }
            })?
            .clone();
        stats.cache_hits += dependencies.hits() - hits_before;
        Ok(entries)
    }

    /// Already-fetched requirements of `dependency` at `version`, if any.
    pub fn cached_dependencies(
        &self,
        dependency: &Dependency,
        version: &PinnedVersion,
    ) -> Option<Rc<Vec<DependencyEntry>>> {
        self.dependencies
            .get(&PinnedDependency {
                dependency: dependency.clone(),
                version: version.clone(),
            })
            .cloned()
    }

    /// Remember that requiring `specifier` for `dependency` always fails.
    pub fn set_cached_error(
        &mut self,
        error: ResolveError,
        dependency: &Dependency,
        specifier: &VersionSpecifier,
    ) {
        if !self.cache_conflicts {
            return;
        }
        tracing::trace!("Caching conflict for {dependency} {specifier}");
        self.conflicts.insert(
            ConstrainedDependency {
                dependency: dependency.clone(),
                specifier: specifier.clone(),
            },
            error,
        );
    }

    /// A conflict previously proven for this exact requirement.
    pub fn cached_error(
        &mut self,
        dependency: &Dependency,
        specifier: &VersionSpecifier,
    ) -> Option<ResolveError> {
        let error = self
            .conflicts
            .get(&ConstrainedDependency {
                dependency: dependency.clone(),
                specifier: specifier.clone(),
            })
            .cloned();
        if error.is_some() {
            self.stats.conflict_hits += 1;
        }
        error
    }

    pub fn stats(&self) -> RetrievalStats {
        self.stats
    }
}

fn fetch_versions<P: DependencyProvider + ?Sized>(
    provider: &P,
    pinned_versions: &HashMap<Dependency, PinnedVersion>,
    stats: &mut RetrievalStats,
    dependency: &Dependency,
    specifier: &VersionSpecifier,
    is_updatable: bool,
) -> Result<ConcreteVersionSet, ResolveError> {
    if !is_updatable {
        if let Some(pinned) = pinned_versions.get(dependency) {
            // Left unfiltered so a mismatch surfaces as a conflict with the pin.
            return Ok(ConcreteVersionSet::pinned(
                ConcreteVersion::new(pinned.clone()),
                specifier.clone(),
            ));
        }
    }

    let found = match specifier {
        VersionSpecifier::GitReference(reference) => {
            stats.reference_resolutions += 1;
            provider
                .resolve_reference(dependency, reference)
                .map(|version| vec![version])
        }
        _ => {
            stats.version_listings += 1;
            provider.list_versions(dependency)
        }
    }
    .map_err(|e| {
        tracing::warn!("Caught error while retrieving versions for {dependency}: {e}");
        ResolveError::internal(format!("retrieving versions of {dependency}"), e)
    })?;

    let mut set = ConcreteVersionSet::new();
    for version in found {
        set.insert(ConcreteVersion::new(version));
    }
    set.retain(specifier);
    tracing::debug!("Versions for {dependency} compatible with {specifier}: {set}");
    Ok(set)
}

fn describe_entries(entries: &[DependencyEntry]) -> String {
    if entries.is_empty() {
        return "none".to_string();
    }
    entries
        .iter()
        .map(|(dependency, specifier)| format!("{dependency} {specifier}"))
        .collect::<Vec<_>>()
        .join(", ")
}
