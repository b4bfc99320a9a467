//! Package dependency graph and conversion ordering.
//!
//! An edge `a -> b` means package `a` declares a local path dependency on
//! package `b`, and `b` belongs to the same [`PackageSet`]. Registry-only
//! dependencies never create edges.
//!
//! # Ordering
//!
//! Packages are converted dependencies-first: for `a -> b -> c` the order is
//! `c`, `b`, `a`. Packages with no remaining constraint between them keep
//! their input order.

use crate::error::{LinkError, Result};
use crate::manifest::PackageSet;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Adjacency list keyed by package name.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Node names in input order.
    nodes: Vec<String>,
    /// Node name to the names it depends on.
    edges: HashMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Builds the graph from local path declarations.
    ///
    /// Path dependencies on names outside `packages` are dropped. A package
    /// listing itself is dropped too, so the graph never has self-loops.
    pub fn build(packages: &PackageSet) -> Self {
        let mut graph = DependencyGraph::default();

        for pkg in packages {
            let deps = graph.add_node(&pkg.name);
            for (dep, path) in pkg.local_dependencies() {
                if dep == pkg.name {
                    log::warn!("Package '{}' declares a path dependency on itself", pkg.name);
                    continue;
                }
                if !packages.contains(dep) {
                    log::debug!(
                        "'{}' -> '{}' ({}) is outside the package set, ignoring",
                        pkg.name,
                        dep,
                        path
                    );
                    continue;
                }
                deps.insert(dep.to_string());
            }
        }

        graph
    }

    /// Builds a graph from explicit `(name, dependencies)` pairs.
    ///
    /// Dependencies naming unknown nodes are ignored.
    pub fn from_edges<'a, I, D>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator<Item = &'a str>,
    {
        let entries: Vec<(&str, Vec<&str>)> = entries
            .into_iter()
            .map(|(name, deps)| (name, deps.into_iter().collect()))
            .collect();
        let known: HashSet<&str> = entries.iter().map(|(name, _)| *name).collect();

        let mut graph = DependencyGraph::default();
        for (name, deps) in entries {
            let edges = graph.add_node(name);
            for dep in deps {
                if dep != name && known.contains(dep) {
                    edges.insert(dep.to_string());
                }
            }
        }
        graph
    }

    fn add_node(&mut self, name: &str) -> &mut BTreeSet<String> {
        if !self.edges.contains_key(name) {
            self.nodes.push(name.to_string());
        }
        self.edges.entry(name.to_string()).or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node names in input order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Direct dependencies of `name`.
    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(name)
    }

    /// Packages that directly depend on `name`, in input order.
    pub fn dependents(&self, name: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| self.edges[node.as_str()].contains(name))
            .map(String::as_str)
            .collect()
    }

    /// Returns package names with every dependency before its dependents.
    ///
    /// Stable Kahn's algorithm: each round emits the first node in input
    /// order whose dependencies have all been emitted.
    ///
    /// # Errors
    ///
    /// `Cycle` naming the packages that lie on a dependency cycle.
    pub fn conversion_order(&self) -> Result<Vec<String>> {
        let mut remaining: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|n| (n.as_str(), self.edges[n.as_str()].len()))
            .collect();
        let mut emitted: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        let mut order = Vec::with_capacity(self.nodes.len());

        while order.len() < self.nodes.len() {
            let next = self
                .nodes
                .iter()
                .map(String::as_str)
                .find(|n| !emitted.contains(n) && remaining[n] == 0);

            let Some(node) = next else {
                return Err(LinkError::Cycle(self.cycle_members(&emitted)));
            };

            emitted.insert(node);
            order.push(node.to_string());
            for dependent in self.dependents(node) {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count = count.saturating_sub(1);
                }
            }
        }

        log::debug!("Conversion order: {}", order.join(" -> "));
        Ok(order)
    }

    /// Packages in a strongly connected component of more than one node,
    /// in input order. Self-loops never reach the graph, so every such
    /// component is a cycle.
    fn cycle_members(&self, emitted: &HashSet<&str>) -> Vec<String> {
        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let index: HashMap<&str, NodeIndex> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|n| !emitted.contains(n))
            .map(|n| (n, graph.add_node(n)))
            .collect();

        for (name, &from) in &index {
            for dep in &self.edges[*name] {
                if let Some(&to) = index.get(dep.as_str()) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let on_cycle: HashSet<&str> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .flatten()
            .map(|idx| graph[idx])
            .collect();

        self.nodes
            .iter()
            .filter(|n| on_cycle.contains(n.as_str()))
            .cloned()
            .collect()
    }
}
