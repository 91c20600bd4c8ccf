//! Graph of an accepted assignment: who requires what, at which version.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use depsolve_core::dependency::Dependency;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::retriever::DependencyEntry;
use crate::version::{PinnedVersion, VersionSpecifier};

/// A dependency together with the version it resolved to.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResolvedNode {
    pub dependency: Dependency,
    pub version: PinnedVersion,
}

impl fmt::Display for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.dependency, self.version)
    }
}

/// A node in the graph: the root project or a resolved dependency.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum GraphNode {
    Root,
    Resolved(ResolvedNode),
}

impl GraphNode {
    pub fn resolved(&self) -> Option<&ResolvedNode> {
        match self {
            Self::Root => None,
            Self::Resolved(node) => Some(node),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Root => "",
            Self::Resolved(node) => &node.dependency.name,
        }
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("(root)"),
            Self::Resolved(node) => write!(f, "{node}"),
        }
    }
}

/// Edge label: the requirement the source placed on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEdge {
    pub specifier: VersionSpecifier,
}

/// The resolved dependency graph backed by petgraph.
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, DepEdge>,
    index: BTreeMap<Dependency, NodeIndex>,
    root: NodeIndex,
}

impl DependencyGraph {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(GraphNode::Root);
        Self {
            graph,
            index: BTreeMap::new(),
            root,
        }
    }

    /// Build the graph of `versions`, with the root requiring
    /// `requirements` and each resolved dependency requiring whatever
    /// `transitive` reports for its version.
    ///
    /// Requirements on dependencies absent from `versions` are skipped.
    pub fn build<F>(
        requirements: &[DependencyEntry],
        versions: &BTreeMap<Dependency, PinnedVersion>,
        mut transitive: F,
    ) -> Self
    where
        F: FnMut(&Dependency, &PinnedVersion) -> Option<Rc<Vec<DependencyEntry>>>,
    {
        let mut g = Self::new();
        for (dependency, version) in versions {
            g.add_node(ResolvedNode {
                dependency: dependency.clone(),
                version: version.clone(),
            });
        }

        let root = g.root;
        for (dependency, specifier) in requirements {
            if let Some(to) = g.find_dependency(dependency) {
                g.add_edge(root, to, DepEdge { specifier: specifier.clone() });
            }
        }

        for (dependency, version) in versions {
            let Some(from) = g.find_dependency(dependency) else {
                continue;
            };
            let Some(entries) = transitive(dependency, version) else {
                continue;
            };
            for (child, specifier) in entries.iter() {
                if let Some(to) = g.find_dependency(child) {
                    g.add_edge(from, to, DepEdge { specifier: specifier.clone() });
                }
            }
        }
        g
    }

    /// Add or retrieve a node. If the dependency already exists, returns the existing index.
    pub fn add_node(&mut self, node: ResolvedNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.dependency) {
            return idx;
        }
        let dependency = node.dependency.clone();
        let idx = self.graph.add_node(GraphNode::Resolved(node));
        self.index.insert(dependency, idx);
        idx
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Add an edge from `from` to `to` unless one already exists.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: DepEdge) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    /// Look up a node by dependency name. When several sources share the
    /// name, the first in dependency order wins.
    pub fn find(&self, name: &str) -> Option<NodeIndex> {
        self.index
            .iter()
            .find(|(dependency, _)| dependency.name == name)
            .map(|(_, &idx)| idx)
    }

    pub fn find_dependency(&self, dependency: &Dependency) -> Option<NodeIndex> {
        self.index.get(dependency).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    /// Direct dependencies of a node, sorted by name.
    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        self.neighbors(idx, Direction::Outgoing)
    }

    /// Reverse dependencies (who requires this node), sorted by name.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        self.neighbors(idx, Direction::Incoming)
    }

    fn neighbors(&self, idx: NodeIndex, direction: Direction) -> Vec<(NodeIndex, &DepEdge)> {
        let mut out: Vec<(NodeIndex, &DepEdge)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                (other, e.weight())
            })
            .collect();
        out.sort_by(|a, b| self.graph[a.0].name().cmp(self.graph[b.0].name()));
        out
    }

    /// Render the tree below the root, annotating each dependency with the
    /// requirement that introduced it.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}\n", self.graph[self.root]));

        let mut visited = HashSet::new();
        visited.insert(self.root);

        let deps = self.dependencies_of(self.root);
        let count = deps.len();
        for (i, (idx, edge)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(&mut output, *idx, edge, "", is_last, 1, max_depth, &mut visited);
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        edge: &DepEdge,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node} ({})\n", edge.specifier));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        // Cycles are printed once.
        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, child_edge)) in deps.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_subtree(
                output,
                *child,
                child_edge,
                &child_prefix,
                is_last,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// The chain of nodes from the root down to the dependency called `name`.
    pub fn find_path(&self, name: &str) -> Option<Vec<&GraphNode>> {
        let target = self.find(name)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(self.root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (child, _) in self.dependencies_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        visited.remove(&current);
        false
    }

    /// Render everything that (transitively) requires the dependency called `name`.
    pub fn print_inverted_tree(&self, name: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.find(name) else {
            return output;
        };

        output.push_str(&format!("{}\n", self.graph[idx]));

        let mut visited = HashSet::new();
        visited.insert(idx);

        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, edge)) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(&mut output, *dep_idx, edge, "", is_last, &mut visited);
        }

        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        edge: &DepEdge,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        let node = &self.graph[idx];
        output.push_str(&format!("{prefix}{connector}{node} (requires {})\n", edge.specifier));

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, dep_edge)) in dependents.iter().enumerate() {
            let is_last = i == count - 1;
            self.print_inverted_subtree(output, *dep_idx, dep_edge, &child_prefix, is_last, visited);
        }

        visited.remove(&idx);
    }

    /// Number of resolved nodes (the root is not counted).
    pub fn len(&self) -> usize {
        self.graph.node_count().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
