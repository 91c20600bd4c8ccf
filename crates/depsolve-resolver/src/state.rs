//! Per-branch resolution state.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use depsolve_core::dependency::Dependency;
use indexmap::{IndexMap, IndexSet};

use crate::error::{ResolveError, VersionRequirement};
use crate::retriever::{DependencyEntry, DependencyProvider, Retriever};
use crate::version::{intersection, ConcreteVersion, PinnedVersion, VersionSpecifier};
use crate::version_set::{ConcreteVersionSet, DependencySpec};

/// What [`DependencySet::pop_sub_set`] produced.
#[derive(Debug)]
pub enum SubSet {
    /// A clone committed to the popped candidate; the parent keeps the rest.
    Branch(DependencySet),
    /// The popped dependency had a single candidate and was expanded in place.
    InPlace,
}

/// The candidate assignment of one search branch.
///
/// Cloning is cheap: candidate sets are shared until one side mutates them.
#[derive(Debug, Clone)]
pub struct DependencySet {
    contents: IndexMap<Dependency, Rc<ConcreteVersionSet>>,
    unresolved: IndexSet<Dependency>,
    /// `None` means every dependency may be updated.
    updatable_names: Option<HashSet<String>>,
    rejection_error: Option<ResolveError>,
}

impl DependencySet {
    /// Build the root state and fold in the root requirements.
    ///
    /// Only collaborator failures are returned as errors; a root-level
    /// conflict leaves the state rejected instead.
    pub fn new<P: DependencyProvider + ?Sized>(
        requirements: &[DependencyEntry],
        updatable_names: Option<HashSet<String>>,
        retriever: &mut Retriever<'_, P>,
    ) -> Result<Self, ResolveError> {
        let mut set = Self {
            contents: IndexMap::new(),
            unresolved: requirements.iter().map(|(d, _)| d.clone()).collect(),
            updatable_names,
            rejection_error: None,
        };
        set.update(None, requirements, false, retriever)?;
        Ok(set)
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection_error.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn is_accepted(&self) -> bool {
        !self.is_rejected() && self.is_complete()
    }

    pub fn rejection_error(&self) -> Option<&ResolveError> {
        self.rejection_error.as_ref()
    }

    /// Dependencies whose transitive requirements have not been folded in yet.
    pub fn unresolved(&self) -> impl Iterator<Item = &Dependency> {
        self.unresolved.iter()
    }

    pub fn versions(&self, dependency: &Dependency) -> Option<&ConcreteVersionSet> {
        self.contents.get(dependency).map(|set| set.as_ref())
    }

    /// The newest remaining candidate of every dependency.
    pub fn resolved_dependencies(&self) -> BTreeMap<Dependency, PinnedVersion> {
        self.contents
            .iter()
            .filter_map(|(dependency, set)| {
                set.first()
                    .map(|version| (dependency.clone(), version.pinned().clone()))
            })
            .collect()
    }

    pub fn is_updatable(&self, dependency: &Dependency) -> bool {
        match &self.updatable_names {
            None => true,
            Some(names) => names.contains(&dependency.name),
        }
    }

    fn add_updatable(&mut self, dependency: &Dependency) {
        if let Some(names) = &mut self.updatable_names {
            names.insert(dependency.name.clone());
        }
    }

    fn reject(&mut self, error: ResolveError) {
        tracing::trace!("Rejecting dependency set: {error}");
        self.rejection_error = Some(error);
    }

    /// Take the newest candidate of the first unresolved dependency that has
    /// one and fold in its transitive requirements.
    ///
    /// With several candidates left the work happens on a clone collapsed to
    /// that candidate, and the candidate is removed here so the next pop
    /// tries its sibling. Returns `None` when nothing is left to pop.
    pub fn pop_sub_set<P: DependencyProvider + ?Sized>(
        &mut self,
        retriever: &mut Retriever<'_, P>,
    ) -> Result<Option<SubSet>, ResolveError> {
        let next = self.unresolved.iter().find_map(|dependency| {
            let set = self.contents.get(dependency)?;
            let version = set.first()?;
            Some((dependency.clone(), version.clone(), set.len()))
        });
        let Some((dependency, version, count)) = next else {
            return Ok(None);
        };
        tracing::trace!("Popped {dependency} at {version} ({count} candidates)");

        let force_updatable = self.is_updatable(&dependency);
        let transitive = retriever.find_dependencies(&dependency, version.pinned())?;

        if count > 1 {
            let mut branch = self.clone();
            branch.collapse(&dependency, &version);
            self.remove_candidate(&dependency, &version);
            branch.update(Some(&dependency), &transitive, force_updatable, retriever)?;
            Ok(Some(SubSet::Branch(branch)))
        } else {
            self.update(Some(&dependency), &transitive, force_updatable, retriever)?;
            Ok(Some(SubSet::InPlace))
        }
    }

    fn collapse(&mut self, dependency: &Dependency, version: &ConcreteVersion) {
        if let Some(set) = self.contents.get_mut(dependency) {
            Rc::make_mut(set).remove_all_except(version);
        }
    }

    fn remove_candidate(&mut self, dependency: &Dependency, version: &ConcreteVersion) {
        if let Some(set) = self.contents.get_mut(dependency) {
            Rc::make_mut(set).remove(version);
        }
    }

    /// Fold the requirements declared by `parent` (the root project when
    /// `None`) into this state.
    ///
    /// Stops at the first conflict, leaving the state rejected. A state that
    /// is already rejected is left untouched.
    pub fn update<P: DependencyProvider + ?Sized>(
        &mut self,
        parent: Option<&Dependency>,
        entries: &[DependencyEntry],
        force_updatable: bool,
        retriever: &mut Retriever<'_, P>,
    ) -> Result<(), ResolveError> {
        if self.is_rejected() {
            return Ok(());
        }
        if let Some(parent) = parent {
            self.unresolved.shift_remove(parent);
        }

        for (dependency, specifier) in entries {
            if let Some(error) = retriever.cached_error(dependency, specifier) {
                tracing::trace!("Known conflict for {dependency} {specifier}");
                self.reject(error);
                return Ok(());
            }

            let is_updatable = force_updatable || self.is_updatable(dependency);
            if force_updatable {
                self.add_updatable(dependency);
            }
            let current = DependencySpec::new(parent.cloned(), specifier.clone());

            // Requirements that cannot overlap conflict whatever the candidates.
            let incompatible = self.contents.get(dependency).and_then(|existing| {
                let spec = incompatible_spec(existing, &current)?;
                let cacheable = spec.parent.is_none() && !existing.is_pinned();
                Some((incompatible_requirements(dependency, spec, &current), cacheable))
            });
            if let Some((error, cacheable)) = incompatible {
                if cacheable {
                    retriever.set_cached_error(error.clone(), dependency, specifier);
                }
                self.reject(error);
                return Ok(());
            }

            let needs_retrieval = match self.contents.get(dependency) {
                None => true,
                Some(existing) => existing.is_pinned() && is_updatable,
            };

            let accepted = if needs_retrieval {
                self.replace_versions(dependency, current, is_updatable, retriever)?
            } else {
                self.constrain_versions(dependency, current, retriever)
            };
            if !accepted {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Install a freshly retrieved candidate set for `dependency`, carrying
    /// over the requirements recorded on a pinned set it replaces.
    fn replace_versions<P: DependencyProvider + ?Sized>(
        &mut self,
        dependency: &Dependency,
        current: DependencySpec,
        is_updatable: bool,
        retriever: &mut Retriever<'_, P>,
    ) -> Result<bool, ResolveError> {
        let mut fresh =
            match retriever.find_all_versions(dependency, &current.specifier, is_updatable) {
                Ok(set) => set,
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    // A pinned dependency may still succeed where it is not updatable.
                    if !retriever.is_pinned(dependency) {
                        retriever.set_cached_error(error.clone(), dependency, &current.specifier);
                    }
                    self.reject(error);
                    return Ok(false);
                }
            };

        if let Some(previous) = self.contents.get(dependency) {
            if let Some(pinned_under) = previous.pinned_version_specifier() {
                tracing::debug!(
                    "Replacing versions of {dependency} pinned under {pinned_under} with {fresh}"
                );
            }
            for spec in previous.specs() {
                fresh.retain(&spec.specifier);
                fresh.add_spec(spec.clone());
            }
        }
        let pin = pin_of(&fresh);
        fresh.add_spec(current.clone());

        if !fresh.retain(&current.specifier) {
            let error = conflict_for(dependency, &fresh, pin, &current);
            self.contents.insert(dependency.clone(), Rc::new(fresh));
            self.reject(error);
            return Ok(false);
        }

        self.contents.insert(dependency.clone(), Rc::new(fresh));
        self.unresolved.insert(dependency.clone());
        Ok(true)
    }

    /// Narrow the existing candidate set of `dependency` by `current`.
    fn constrain_versions<P: DependencyProvider + ?Sized>(
        &mut self,
        dependency: &Dependency,
        current: DependencySpec,
        retriever: &mut Retriever<'_, P>,
    ) -> bool {
        let Some(existing) = self.contents.get_mut(dependency) else {
            return false;
        };
        let set = Rc::make_mut(existing);
        let pin = pin_of(set);
        set.add_spec(current.clone());
        if set.retain(&current.specifier) {
            return true;
        }

        let was_pinned = pin.is_some();
        let error = conflict_for(dependency, set, pin, &current);
        if let ResolveError::IncompatibleRequirements { existing, .. } = &error {
            if existing.from.is_none() && !was_pinned {
                retriever.set_cached_error(error.clone(), dependency, &current.specifier);
            }
        }
        self.reject(error);
        false
    }
}

/// The pinned candidate of a set that came from a previous resolution.
fn pin_of(set: &ConcreteVersionSet) -> Option<ConcreteVersion> {
    if set.is_pinned() {
        set.first().cloned()
    } else {
        None
    }
}

/// The earliest requirement on `set` that has no overlap with `current`.
fn incompatible_spec<'s>(
    set: &'s ConcreteVersionSet,
    current: &DependencySpec,
) -> Option<&'s DependencySpec> {
    set.specs()
        .iter()
        .find(|spec| intersection(&spec.specifier, &current.specifier).is_none())
}

fn incompatible_requirements(
    dependency: &Dependency,
    existing: &DependencySpec,
    new: &DependencySpec,
) -> ResolveError {
    ResolveError::IncompatibleRequirements {
        dependency: dependency.clone(),
        existing: existing.into(),
        new: new.into(),
    }
}

/// Describe why `current` emptied the candidate set of `dependency`.
fn conflict_for(
    dependency: &Dependency,
    set: &ConcreteVersionSet,
    pin: Option<ConcreteVersion>,
    current: &DependencySpec,
) -> ResolveError {
    if let Some(spec) = incompatible_spec(set, current) {
        return incompatible_requirements(dependency, spec, current);
    }

    // Pins are recorded by the root project.
    if let Some(pinned) = pin {
        let specifier = match pinned.semantic() {
            Some(version) => VersionSpecifier::Exactly(version.clone()),
            None => VersionSpecifier::GitReference(pinned.pinned().to_string()),
        };
        return ResolveError::IncompatibleRequirements {
            dependency: dependency.clone(),
            existing: VersionRequirement {
                specifier,
                from: None,
            },
            new: current.into(),
        };
    }

    ResolveError::UnsatisfiableDependencyList {
        names: vec![dependency.name.clone()],
    }
}

impl fmt::Display for DependencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (dependency, set) in &self.contents {
            let marker = if self.unresolved.contains(dependency) {
                " (unresolved)"
            } else {
                ""
            };
            writeln!(f, "{dependency}{marker}: {set}")?;
            for spec in set.specs() {
                writeln!(f, "    {spec}")?;
            }
        }
        if let Some(error) = &self.rejection_error {
            writeln!(f, "rejected: {error}")?;
        }
        Ok(())
    }
}
