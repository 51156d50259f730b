//! Publish order resolution
//!
//! The curated order from configuration is checked against the
//! workspace-relative dependency edges declared in the manifests. The order
//! actually used is a topological sort of those edges in which the curated
//! position breaks ties, so a correct curated list comes out unchanged.

use crate::core::{
    config::OrderCheck,
    error::PlanError,
    package::{PackageDescriptor, Workspace},
};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Hand-curated publish order, dependencies first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOrder {
    ids: Vec<String>,
}

impl PublishOrder {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }
}

/// A package listed before one of its dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderViolation {
    pub package: String,
    pub dependency: String,
}

impl fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is listed before its dependency '{}'",
            self.package, self.dependency
        )
    }
}

/// Workspace-relative dependency edges between listed packages
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// package -> packages it depends on
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_package(&mut self, id: &str) {
        self.edges.entry(id.to_string()).or_default();
    }

    pub fn add_dependency(&mut self, package: &str, dependency: &str) {
        self.add_package(dependency);
        self.edges
            .entry(package.to_string())
            .or_default()
            .insert(dependency.to_string());
    }

    /// Build the graph of every package in the curated order
    pub fn from_workspace(order: &PublishOrder, workspace: &Workspace) -> Result<Self, PlanError> {
        let mut graph = Self::new();

        for id in order.ids() {
            let package = workspace
                .get(id)
                .ok_or_else(|| PlanError::UnknownPackage(id.clone()))?;
            if package.private {
                return Err(PlanError::PrivatePackage(id.clone()));
            }
            graph.add_package(id);

            for name in &package.workspace_dependencies {
                let Some(dependency) = workspace.id_for_manifest_name(name) else {
                    warn!(
                        "{} references '{}' with the workspace protocol, \
                         but no package has that name",
                        id, name
                    );
                    continue;
                };
                if dependency == id.as_str() {
                    continue;
                }
                if !order.contains(dependency) {
                    let private = workspace.get(dependency).is_some_and(|p| p.private);
                    if private {
                        warn!("{} depends on private package {}", id, dependency);
                        continue;
                    }
                    return Err(PlanError::UnlistedDependency {
                        package: id.clone(),
                        dependency: dependency.to_string(),
                    });
                }
                graph.add_dependency(id, dependency);
            }
        }

        Ok(graph)
    }

    pub fn dependencies_of(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(id)
    }

    /// Every package `id` depends on, directly or not
    pub fn transitive_dependencies(&self, id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(deps) = self.edges.get(current) {
                for dep in deps {
                    if seen.insert(dep.clone()) {
                        stack.push(dep);
                    }
                }
            }
        }
        seen
    }

    /// Edges the curated order gets wrong
    ///
    /// Checking direct edges is enough: if every direct dependency comes
    /// first, every transitive one does too.
    pub fn violations(&self, order: &PublishOrder) -> Vec<OrderViolation> {
        let mut violations = Vec::new();
        for id in order.ids() {
            let Some(position) = order.position(id) else { continue };
            for dep in self.edges.get(id).into_iter().flatten() {
                if order.position(dep).map_or(true, |dep_position| dep_position > position) {
                    violations.push(OrderViolation {
                        package: id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        violations
    }

    /// Topological sort, ties broken by curated position
    pub fn resolve(&self, order: &PublishOrder) -> Result<Vec<String>, PlanError> {
        let rank = |id: &str| order.position(id).unwrap_or(usize::MAX);

        // dependency -> dependent
        let mut graph: DiGraph<&str, ()> = DiGraph::with_capacity(self.edges.len(), 0);
        let nodes: BTreeMap<&str, NodeIndex> = self
            .edges
            .keys()
            .map(|id| (id.as_str(), graph.add_node(id.as_str())))
            .collect();
        for (id, deps) in &self.edges {
            for dep in deps {
                let (Some(&from), Some(&to)) = (nodes.get(dep.as_str()), nodes.get(id.as_str()))
                else {
                    continue;
                };
                graph.add_edge(from, to, ());
            }
        }

        // Kahn's algorithm over a ready set ordered by (rank, id)
        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|node| graph.neighbors_directed(node, Direction::Incoming).count())
            .collect();
        let mut ready: BTreeSet<(usize, &str)> = graph
            .node_indices()
            .filter(|node| in_degree[node.index()] == 0)
            .map(|node| (rank(graph[node]), graph[node]))
            .collect();

        let mut sorted = Vec::with_capacity(graph.node_count());
        while let Some((_, id)) = ready.pop_first() {
            sorted.push(id.to_string());
            let Some(&node) = nodes.get(id) else { continue };

            for dependent in graph.neighbors_directed(node, Direction::Outgoing) {
                let degree = &mut in_degree[dependent.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.insert((rank(graph[dependent]), graph[dependent]));
                }
            }
        }

        if sorted.len() != graph.node_count() {
            // Only members of a cycle, not the packages stuck behind one
            let mut cyclic: Vec<&str> = tarjan_scc(&graph)
                .into_iter()
                .filter(|component| {
                    component.len() > 1
                        || component.first().is_some_and(|&node| graph.contains_edge(node, node))
                })
                .flatten()
                .map(|node| graph[node])
                .collect();
            cyclic.sort_by_key(|id| (rank(id), *id));
            return Err(PlanError::Cycle(cyclic.into_iter().map(String::from).collect()));
        }

        Ok(sorted)
    }
}

/// Packages to publish, in the order they will be published
#[derive(Debug, Clone)]
pub struct PublishPlan {
    pub packages: Vec<PackageDescriptor>,

    /// Mistakes found in the curated order
    pub violations: Vec<OrderViolation>,

    /// Template packages skipped during discovery
    pub excluded: Vec<String>,
}

impl PublishPlan {
    pub fn resolve(
        order: &PublishOrder,
        workspace: &Workspace,
        check: OrderCheck,
    ) -> Result<Self, PlanError> {
        let graph = DependencyGraph::from_workspace(order, workspace)?;
        let resolved = graph.resolve(order)?;
        let violations = graph.violations(order);

        if !violations.is_empty() {
            if check == OrderCheck::Strict {
                return Err(PlanError::OrderViolations(violations));
            }
            for violation in &violations {
                warn!("Publish order: {}", violation);
            }
        }

        debug!("Resolved publish order: {}", resolved.join(", "));

        let packages = resolved
            .iter()
            .map(|id| {
                workspace
                    .get(id)
                    .cloned()
                    .ok_or_else(|| PlanError::UnknownPackage(id.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            packages,
            violations,
            excluded: workspace.excluded().to_vec(),
        })
    }

    pub fn ids(&self) -> Vec<String> {
        self.packages.iter().map(|p| p.id.clone()).collect()
    }
}
