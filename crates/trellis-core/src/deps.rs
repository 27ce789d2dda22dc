//! Dependency index between diff records

use std::collections::HashMap;

use petgraph::algo::is_cyclic_directed;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;

use crate::model::DiffId;

/// Directed dependency graph over record ids.
///
/// An edge `owner -> dependent` means the dependent's publish cascade follows
/// from the owner's; walking the inverse direction drives undo cascades. Ids
/// may reference elements that carry no record of their own, such as a public
/// vertex whose edge is pending. The index is rebuilt from scratch on every
/// grouping pass, never patched in place.
#[derive(Debug, Default)]
pub struct DependencyIndex {
    graph: StableDiGraph<DiffId, ()>,
    nodes: HashMap<DiffId, NodeIndex>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, id: &DiffId) -> NodeIndex {
        if let Some(&index) = self.nodes.get(id) {
            return index;
        }
        let index = self.graph.add_node(id.clone());
        self.nodes.insert(id.clone(), index);
        index
    }

    /// Record that `dependent` follows `owner` through publish cascades.
    pub fn add_dependency(&mut self, owner: &DiffId, dependent: &DiffId) {
        let owner = self.node(owner);
        let dependent = self.node(dependent);
        if !self.graph.contains_edge(owner, dependent) {
            self.graph.add_edge(owner, dependent, ());
        }
    }

    /// Records whose publish cascade follows from `id`. Empty when unknown.
    pub fn dependents(&self, id: &DiffId) -> Vec<DiffId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Inverse relation: the owners `id` itself depends on.
    pub fn undo_dependents(&self, id: &DiffId) -> Vec<DiffId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &DiffId, direction: Direction) -> Vec<DiffId> {
        let Some(&index) = self.nodes.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(index, direction)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect()
    }

    /// Grouping only ever produces an acyclic index; cascades rely on it.
    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.graph)
    }

    pub fn len(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }
}
