mod common;

use std::collections::{HashMap, HashSet};

use common::{by_name, dep, expected, spec, StubProvider};
use depsolve_core::config::ResolverConfig;
use depsolve_resolver::backtrack::{ResolverState, Search};
use depsolve_resolver::retriever::{DependencyEntry, Retriever};
use depsolve_resolver::state::{DependencySet, SubSet};
use depsolve_resolver::version::PinnedVersion;

fn entries(list: &[(&str, &str)]) -> Vec<DependencyEntry> {
    list.iter().map(|(n, s)| (dep(n), spec(s))).collect()
}

fn candidates(set: &DependencySet, name: &str) -> Vec<String> {
    set.versions(&dep(name))
        .map(|s| s.iter().map(|v| v.to_string()).collect())
        .unwrap_or_default()
}

#[test]
fn root_requirements_become_unresolved() {
    let provider = StubProvider::new()
        .versions("A", &["1.0.0", "2.0.0"])
        .versions("B", &["0.9.0"]);
    let mut retriever = Retriever::new(&provider, HashMap::new(), true);

    let set = DependencySet::new(&entries(&[("A", "*"), ("B", "*")]), None, &mut retriever)
        .unwrap();

    assert!(!set.is_rejected());
    assert!(!set.is_complete());
    let unresolved: Vec<&str> = set.unresolved().map(|d| d.name.as_str()).collect();
    assert_eq!(unresolved, ["A", "B"]);
    assert_eq!(candidates(&set, "A"), ["2.0.0", "1.0.0"]);
}

#[test]
fn branch_is_independent_of_its_parent() {
    let provider = StubProvider::new()
        .versions("A", &["1.0.0", "2.0.0"])
        .versions("B", &["1.0.0", "2.0.0"])
        .requires("A", "2.0.0", &[("B", "~> 2.0")]);
    let mut retriever = Retriever::new(&provider, HashMap::new(), true);
    let mut root =
        DependencySet::new(&entries(&[("A", "*"), ("B", "*")]), None, &mut retriever).unwrap();

    let Some(SubSet::Branch(branch)) = root.pop_sub_set(&mut retriever).unwrap() else {
        panic!("expected a branch for a dependency with two candidates");
    };

    assert_eq!(candidates(&branch, "A"), ["2.0.0"]);
    assert_eq!(candidates(&branch, "B"), ["2.0.0"]);
    assert_eq!(candidates(&root, "A"), ["1.0.0"]);
    assert_eq!(candidates(&root, "B"), ["2.0.0", "1.0.0"]);

    let branch_unresolved: Vec<&str> = branch.unresolved().map(|d| d.name.as_str()).collect();
    assert_eq!(branch_unresolved, ["B"]);
    assert_eq!(root.unresolved().count(), 2);
}

#[test]
fn single_candidate_expands_in_place() {
    let provider = StubProvider::new()
        .versions("A", &["1.0.0"])
        .versions("B", &["1.0.0"])
        .requires("A", "1.0.0", &[("B", "*")]);
    let mut retriever = Retriever::new(&provider, HashMap::new(), true);
    let mut set = DependencySet::new(&entries(&[("A", "*")]), None, &mut retriever).unwrap();

    assert!(matches!(
        set.pop_sub_set(&mut retriever).unwrap(),
        Some(SubSet::InPlace)
    ));
    assert_eq!(candidates(&set, "B"), ["1.0.0"]);
    assert!(matches!(
        set.pop_sub_set(&mut retriever).unwrap(),
        Some(SubSet::InPlace)
    ));
    assert!(set.is_accepted());
    assert!(set.pop_sub_set(&mut retriever).unwrap().is_none());
    assert_eq!(
        by_name(&set.resolved_dependencies()),
        expected(&[("A", "1.0.0"), ("B", "1.0.0")])
    );
}

#[test]
fn every_requirement_is_recorded() {
    let provider = StubProvider::new()
        .versions("A", &["1.0.0"])
        .versions("B", &["1.0.0", "1.5.0"])
        .requires("A", "1.0.0", &[("B", ">= 1.2")]);
    let mut retriever = Retriever::new(&provider, HashMap::new(), true);
    let mut set =
        DependencySet::new(&entries(&[("A", "*"), ("B", "~> 1.0")]), None, &mut retriever)
            .unwrap();
    set.pop_sub_set(&mut retriever).unwrap();

    let b = set.versions(&dep("B")).unwrap();
    let specs: Vec<String> = b.specs().iter().map(|s| s.to_string()).collect();
    assert_eq!(specs, ["~> 1.0.0 from root", ">= 1.2.0 from A"]);
    assert_eq!(candidates(&set, "B"), ["1.5.0"]);
}

#[test]
fn rejected_state_ignores_further_updates() {
    let provider = StubProvider::new().versions("A", &["1.0.0"]);
    let mut retriever = Retriever::new(&provider, HashMap::new(), true);
    let mut set = DependencySet::new(&entries(&[("A", ">= 3.0")]), None, &mut retriever).unwrap();
    assert!(set.is_rejected());

    set.update(None, &entries(&[("B", "*")]), false, &mut retriever)
        .unwrap();
    assert!(set.versions(&dep("B")).is_none());
    assert!(provider.version_listings_for("B") == 0);
}

#[test]
fn updatable_names_propagate_through_requirements() {
    let provider = StubProvider::new()
        .versions("A", &["1.0.0"])
        .versions("B", &["1.0.0", "1.1.0"])
        .requires("A", "1.0.0", &[("B", "*")]);
    let pinned = HashMap::from([(dep("B"), PinnedVersion::new("1.0.0"))]);
    let mut retriever = Retriever::new(&provider, pinned, true);
    let updatable = HashSet::from(["A".to_string()]);
    let mut set =
        DependencySet::new(&entries(&[("A", "*")]), Some(updatable), &mut retriever).unwrap();

    assert!(set.is_updatable(&dep("A")));
    assert!(!set.is_updatable(&dep("B")));
    set.pop_sub_set(&mut retriever).unwrap();
    assert!(set.is_updatable(&dep("B")));
    assert_eq!(candidates(&set, "B"), ["1.1.0", "1.0.0"]);
}

#[test]
fn search_accepts_first_complete_branch() {
    let provider = StubProvider::new()
        .versions("A", &["1.0.0", "2.0.0"])
        .versions("C", &["1.0.0", "2.0.0"])
        .requires("A", "2.0.0", &[("C", "~> 2.0")])
        .requires("A", "1.0.0", &[("C", "~> 1.0")]);
    let mut retriever = Retriever::new(&provider, HashMap::new(), true);
    let config = ResolverConfig {
        log_rejections: true,
        ..ResolverConfig::default()
    };
    let _ = depsolve_util::logging::try_init("depsolve_resolver=debug");

    let initial =
        DependencySet::new(&entries(&[("A", "*"), ("C", "~> 1.0")]), None, &mut retriever)
            .unwrap();
    let mut search = Search::new(&mut retriever, &config);
    let (state, set) = search.run(initial).unwrap();

    assert_eq!(state, ResolverState::Accepted);
    assert!(set.is_accepted());
    assert_eq!(
        by_name(&set.resolved_dependencies()),
        expected(&[("A", "1.0.0"), ("C", "1.0.0")])
    );
    let stats = search.stats();
    assert_eq!(stats.branches, 1);
    assert_eq!(stats.max_depth, 2);

    let (report, _) = search.into_parts();
    assert_eq!(report.len(), 1);
    assert_eq!(report.rejections[0].unresolved, ["C"]);
}

#[test]
fn search_rejects_with_root_verdict() {
    let provider = StubProvider::new()
        .versions("A", &["1.0.0"])
        .versions("B", &["1.0.0"])
        .requires("B", "1.0.0", &[("A", ">= 2.0")]);
    let mut retriever = Retriever::new(&provider, HashMap::new(), true);
    let config = ResolverConfig::default();

    let initial =
        DependencySet::new(&entries(&[("A", "*"), ("B", "*")]), None, &mut retriever).unwrap();
    let mut search = Search::new(&mut retriever, &config);
    let (state, set) = search.run(initial).unwrap();

    assert_eq!(state, ResolverState::Rejected);
    assert!(set.rejection_error().is_some());
    assert_eq!(search.stats().rejections, 1);
}
