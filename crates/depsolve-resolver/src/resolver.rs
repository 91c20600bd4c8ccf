//! Entry point: turn a requirement map into a version assignment.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};

use depsolve_core::config::ResolverConfig;
use depsolve_core::dependency::Dependency;

use crate::backtrack::{ResolverState, Search, SearchStats};
use crate::error::ResolveError;
use crate::graph::DependencyGraph;
use crate::rejection::RejectionReport;
use crate::retriever::{DependencyEntry, DependencyProvider, RetrievalStats, Retriever};
use crate::state::DependencySet;
use crate::version::{PinnedVersion, VersionSpecifier};

/// Everything a successful resolve call produced.
pub struct Resolution {
    pub versions: BTreeMap<Dependency, PinnedVersion>,
    pub graph: DependencyGraph,
    pub report: RejectionReport,
    pub stats: ResolutionStats,
}

/// Cost of one resolve call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    pub branches: usize,
    pub rejections: usize,
    pub max_depth: usize,
    pub retrieval: RetrievalStats,
    pub elapsed: Duration,
}

/// Backtracking resolver over a [`DependencyProvider`].
///
/// Every call starts from empty caches, so one resolver can be reused for
/// any number of independent calls.
pub struct Resolver<P> {
    provider: P,
    config: ResolverConfig,
}

impl<P: DependencyProvider> Resolver<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, ResolverConfig::default())
    }

    pub fn with_config(provider: P, config: ResolverConfig) -> Self {
        Self { provider, config }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Find the newest version of every dependency reachable from
    /// `requirements` that satisfies every requirement placed on it.
    ///
    /// Dependencies in `previously_pinned` keep their pinned version unless
    /// they are eligible for update: `None` makes every dependency eligible,
    /// `Some(names)` only the named ones (and, transitively, whatever they
    /// require). A non-empty `names_to_update` also drops root requirements
    /// that are neither named nor pinned.
    pub fn resolve(
        &self,
        requirements: &BTreeMap<Dependency, VersionSpecifier>,
        previously_pinned: Option<&BTreeMap<Dependency, PinnedVersion>>,
        names_to_update: Option<&BTreeSet<String>>,
    ) -> Result<BTreeMap<Dependency, PinnedVersion>, ResolveError> {
        self.resolve_detailed(requirements, previously_pinned, names_to_update)
            .map(|resolution| resolution.versions)
    }

    /// Like [`Resolver::resolve`], also returning the dependency graph, the
    /// rejected branches and call statistics.
    pub fn resolve_detailed(
        &self,
        requirements: &BTreeMap<Dependency, VersionSpecifier>,
        previously_pinned: Option<&BTreeMap<Dependency, PinnedVersion>>,
        names_to_update: Option<&BTreeSet<String>>,
    ) -> Result<Resolution, ResolveError> {
        let start = Instant::now();
        let result = self.run(requirements, previously_pinned, names_to_update, start);
        let elapsed = start.elapsed();
        tracing::info!("Resolver took {:.3} s", elapsed.as_secs_f64());

        match &result {
            Ok(resolution) => tracing::info!(
                "Resolver succeeded ({} dependencies, {} branches)",
                resolution.versions.len(),
                resolution.stats.branches
            ),
            Err(e) => tracing::info!("Resolver failed with error: {e}"),
        }
        result
    }

    fn run(
        &self,
        requirements: &BTreeMap<Dependency, VersionSpecifier>,
        previously_pinned: Option<&BTreeMap<Dependency, PinnedVersion>>,
        names_to_update: Option<&BTreeSet<String>>,
        start: Instant,
    ) -> Result<Resolution, ResolveError> {
        let pinned: HashMap<Dependency, PinnedVersion> = previously_pinned
            .map(|p| p.iter().map(|(d, v)| (d.clone(), v.clone())).collect())
            .unwrap_or_default();
        let updatable_names: Option<HashSet<String>> =
            names_to_update.map(|names| names.iter().cloned().collect());

        let roots = root_requirements(requirements, &pinned, updatable_names.as_ref());
        tracing::debug!(
            "Resolving {} root requirements ({} pinned, {} eligible for update)",
            roots.len(),
            pinned.len(),
            match &updatable_names {
                None => "all".to_string(),
                Some(names) => names.len().to_string(),
            }
        );

        let mut retriever = Retriever::new(&self.provider, pinned, self.config.cache_conflicts);
        let initial = DependencySet::new(&roots, updatable_names, &mut retriever)?;

        let mut search = Search::new(&mut retriever, &self.config);
        let (state, set) = search.run(initial)?;
        let (report, search_stats) = search.into_parts();

        let versions = match state {
            ResolverState::Accepted => set.resolved_dependencies(),
            ResolverState::Rejected => return Err(rejection_error(&set)),
        };

        let graph = DependencyGraph::build(&roots, &versions, |dependency, version| {
            retriever.cached_dependencies(dependency, version)
        });

        Ok(Resolution {
            versions,
            graph,
            report,
            stats: stats(search_stats, retriever.stats(), start.elapsed()),
        })
    }
}

/// The requirements the search starts from.
///
/// With a non-empty update list only listed or already pinned dependencies
/// are kept.
fn root_requirements(
    requirements: &BTreeMap<Dependency, VersionSpecifier>,
    pinned: &HashMap<Dependency, PinnedVersion>,
    updatable_names: Option<&HashSet<String>>,
) -> Vec<DependencyEntry> {
    let selective = updatable_names.filter(|names| !names.is_empty());
    requirements
        .iter()
        .filter(|(dependency, _)| match selective {
            None => true,
            Some(names) => names.contains(&dependency.name) || pinned.contains_key(*dependency),
        })
        .map(|(dependency, specifier)| (dependency.clone(), specifier.clone()))
        .collect()
}

fn rejection_error(set: &DependencySet) -> ResolveError {
    match set.rejection_error() {
        Some(error) => error.clone(),
        None => ResolveError::UnresolvedDependencies {
            names: set.unresolved().map(|d| d.name.clone()).collect(),
        },
    }
}

fn stats(search: SearchStats, retrieval: RetrievalStats, elapsed: Duration) -> ResolutionStats {
    ResolutionStats {
        branches: search.branches,
        rejections: search.rejections,
        max_depth: search.max_depth,
        retrieval,
        elapsed,
    }
}
