// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The call graph, generic over its method and call-site keys so that the
//! context-sensitive analyses can instantiate it with context-qualified
//! pairs.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use petgraph::graph::{DefaultIx, DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::util::mono_queue::{Cursor, MonotoneQueue};

/// How a call site dispatches, recorded on every call edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
}

#[derive(Clone, Debug)]
pub struct CallGraphEdge<S> {
    pub kind: CallKind,
    pub callsite: S,
}

/// A call graph over methods `F` and call sites `S`. Reachable methods are
/// exactly the nodes; the graph also feeds a grow-only queue so solvers can
/// keep draining newly reachable methods while they add edges.
pub struct CallGraph<F, S> {
    graph: DiGraph<F, CallGraphEdge<S>>,
    func_nodes: HashMap<F, NodeIndex<DefaultIx>>,
    callsite_to_edges: HashMap<S, Vec<EdgeIndex<DefaultIx>>>,
    reach_funcs: MonotoneQueue<F>,
}

impl<F, S> CallGraph<F, S>
where
    F: Copy + Eq + Hash + Debug,
    S: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        CallGraph {
            graph: DiGraph::new(),
            func_nodes: HashMap::new(),
            callsite_to_edges: HashMap::new(),
            reach_funcs: MonotoneQueue::new(),
        }
    }

    /// Adds a method node, marking it reachable. Returns true if new.
    pub fn add_node(&mut self, func: F) -> bool {
        match self.func_nodes.entry(func) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                let idx = self.graph.add_node(func);
                v.insert(idx);
                self.reach_funcs.push(func);
                true
            }
        }
    }

    fn get_or_insert_node(&mut self, func: F) -> NodeIndex<DefaultIx> {
        match self.func_nodes.entry(func) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                let idx = self.graph.add_node(func);
                self.reach_funcs.push(func);
                *v.insert(idx)
            }
        }
    }

    pub fn contains_method(&self, func: F) -> bool {
        self.func_nodes.contains_key(&func)
    }

    /// Adds the edge `(kind, callsite): caller -> callee` if not present.
    /// Both endpoints become reachable. Returns false if the edge existed.
    pub fn add_edge(&mut self, kind: CallKind, callsite: S, caller: F, callee: F) -> bool {
        if self.callees_of(&callsite).contains(&callee) {
            return false;
        }
        let caller_node = self.get_or_insert_node(caller);
        let callee_node = self.get_or_insert_node(callee);
        let edge = self
            .graph
            .add_edge(caller_node, callee_node, CallGraphEdge { kind, callsite });
        self.callsite_to_edges.entry(callsite).or_default().push(edge);
        true
    }

    /// Callees resolved for a call site so far.
    pub fn callees_of(&self, callsite: &S) -> Vec<F> {
        match self.callsite_to_edges.get(callsite) {
            Some(edges) => edges
                .iter()
                .filter_map(|&e| {
                    self.graph
                        .edge_endpoints(e)
                        .map(|(_, target)| self.graph[target])
                })
                .collect(),
            None => Vec::new(),
        }
    }

    /// Call sites targeting `callee`, with their edge kinds.
    pub fn callers_of(&self, callee: F) -> Vec<(CallKind, S)> {
        let Some(&idx) = self.func_nodes.get(&callee) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.weight().kind, e.weight().callsite))
            .collect()
    }

    /// All edges as `(kind, callsite, caller, callee)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (CallKind, S, F, F)> + '_ {
        self.graph.edge_references().map(|e| {
            (
                e.weight().kind,
                e.weight().callsite,
                self.graph[e.source()],
                self.graph[e.target()],
            )
        })
    }

    /// Reachable methods in discovery order.
    pub fn reachable_methods(&self) -> impl Iterator<Item = F> + '_ {
        self.graph.node_weights().copied()
    }

    pub fn method_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// A cursor for draining the reachable-method queue; see
    /// [`MonotoneQueue`].
    pub fn reach_cursor(&self) -> Cursor {
        self.reach_funcs.cursor()
    }

    pub fn reach_next(&self, cursor: &mut Cursor) -> Option<F> {
        self.reach_funcs.advance(cursor)
    }
}

impl<F, S> Default for CallGraph<F, S>
where
    F: Copy + Eq + Hash + Debug,
    S: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
