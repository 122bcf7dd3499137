// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The pointer flow graph.
//!
//! Nodes are interned pointers; an edge `a -> b` means the points-to set
//! of `b` must include that of `a`. The graph is generic over the pointer
//! key so the context-insensitive and context-sensitive analyses share it.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use petgraph::graph::{DefaultIx, DiGraph, NodeIndex};
use petgraph::Direction;

pub type PfgNodeId = NodeIndex<DefaultIx>;

pub struct PointerFlowGraph<P> {
    graph: DiGraph<P, ()>,
    values: HashMap<P, PfgNodeId>,
}

impl<P> PointerFlowGraph<P>
where
    P: Clone + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        PointerFlowGraph {
            graph: DiGraph::new(),
            values: HashMap::new(),
        }
    }

    /// Interns `pointer`, returning its canonical node id.
    pub fn get_or_insert_node(&mut self, pointer: &P) -> PfgNodeId {
        match self.values.entry(pointer.clone()) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                let idx = self.graph.add_node(pointer.clone());
                *v.insert(idx)
            }
        }
    }

    pub fn get_node_id(&self, pointer: &P) -> Option<PfgNodeId> {
        self.values.get(pointer).copied()
    }

    pub fn pointer(&self, node: PfgNodeId) -> &P {
        &self.graph[node]
    }

    /// Adds the subset edge `src -> dst`, interning both endpoints.
    /// Returns the endpoint ids if the edge is new, `None` otherwise.
    pub fn add_edge(&mut self, src: &P, dst: &P) -> Option<(PfgNodeId, PfgNodeId)> {
        let s = self.get_or_insert_node(src);
        let d = self.get_or_insert_node(dst);
        if self.graph.find_edge(s, d).is_none() {
            self.graph.add_edge(s, d, ());
            Some((s, d))
        } else {
            None
        }
    }

    pub fn has_edge(&self, src: &P, dst: &P) -> bool {
        match (self.values.get(src), self.values.get(dst)) {
            (Some(&s), Some(&d)) => self.graph.find_edge(s, d).is_some(),
            _ => false,
        }
    }

    pub fn succs_of(&self, node: PfgNodeId) -> Vec<PfgNodeId> {
        self.graph
            .neighbors_directed(node, Direction::Outgoing)
            .collect()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = PfgNodeId> {
        self.graph.node_indices()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl<P> Default for PointerFlowGraph<P>
where
    P: Clone + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
