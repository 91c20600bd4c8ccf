//! Depth-first backtracking over dependency sets.

use depsolve_core::config::ResolverConfig;

use crate::error::ResolveError;
use crate::rejection::{RejectedBranch, RejectionReport};
use crate::retriever::{DependencyProvider, Retriever};
use crate::state::{DependencySet, SubSet};

/// Outcome of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Accepted,
    Rejected,
}

/// Counters describing the shape of one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Branches split off for a dependency with more than one candidate.
    pub branches: usize,
    pub rejections: usize,
    /// Deepest nesting of open branches.
    pub max_depth: usize,
}

/// One backtracking search sharing a single [`Retriever`].
pub struct Search<'r, 'p, P: ?Sized> {
    retriever: &'r mut Retriever<'p, P>,
    config: &'r ResolverConfig,
    report: RejectionReport,
    stats: SearchStats,
}

impl<'r, 'p, P: DependencyProvider + ?Sized> Search<'r, 'p, P> {
    pub fn new(retriever: &'r mut Retriever<'p, P>, config: &'r ResolverConfig) -> Self {
        Self {
            retriever,
            config,
            report: RejectionReport::new(),
            stats: SearchStats::default(),
        }
    }

    /// Explore `initial` until some branch is accepted or every branch is
    /// rejected.
    ///
    /// Branches are kept on an explicit stack. The top branch is expanded
    /// until it is accepted, rejected or out of candidates; a rejected branch
    /// is dropped and its parent moves on to its next candidate. On
    /// acceptance the winning branch is returned. On rejection the returned
    /// set is `initial` as last mutated, carrying the root-level verdict.
    pub fn run(
        &mut self,
        initial: DependencySet,
    ) -> Result<(ResolverState, DependencySet), ResolveError> {
        let mut stack = vec![initial];
        self.stats.max_depth = 1;

        while let Some(top) = stack.last_mut() {
            if top.is_rejected() {
                let rejected = stack.pop();
                if let Some(set) = self.finish_rejected(rejected, &stack) {
                    return Ok((ResolverState::Rejected, set));
                }
                continue;
            }
            if top.is_complete() {
                if let Some(accepted) = stack.pop() {
                    return Ok((ResolverState::Accepted, accepted));
                }
                break;
            }

            match top.pop_sub_set(self.retriever)? {
                Some(SubSet::Branch(branch)) => {
                    self.stats.branches += 1;
                    stack.push(branch);
                    self.stats.max_depth = self.stats.max_depth.max(stack.len());
                }
                Some(SubSet::InPlace) => {}
                None => {
                    let exhausted = stack.pop();
                    if let Some(set) = self.finish_rejected(exhausted, &stack) {
                        return Ok((ResolverState::Rejected, set));
                    }
                }
            }
        }

        Err(ResolveError::Internal {
            description: "search ended without a verdict".to_string(),
        })
    }

    /// Record a dropped branch. Hands it back when it was the bottom of the
    /// stack, which ends the search.
    fn finish_rejected(
        &mut self,
        rejected: Option<DependencySet>,
        remaining: &[DependencySet],
    ) -> Option<DependencySet> {
        let set = rejected?;
        self.stats.rejections += 1;

        if self.config.log_rejections {
            tracing::debug!("Rejected dependency set:\n{set}");
        }
        if self.config.record_rejections {
            self.report.add(RejectedBranch {
                unresolved: set.unresolved().map(|d| d.name.clone()).collect(),
                reason: set.rejection_error().cloned(),
            });
        }

        remaining.is_empty().then_some(set)
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    pub fn into_parts(self) -> (RejectionReport, SearchStats) {
        (self.report, self.stats)
    }
}
