// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The intra-procedural control-flow graph.
//!
//! CFGs are built by the host from the IR and handed to the engine, which
//! only traverses them. Nodes are statement ids of one method, including
//! its synthetic entry/exit markers.

use std::collections::HashMap;

use petgraph::graph::{DefaultIx, DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::ir::{MethodId, StmtId};

/// Why an edge exists. Dead-code detection keys on the branch kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CfgEdgeKind {
    /// Entry marker to the first real statement.
    Entry,
    /// Straight-line flow.
    Fallthrough,
    /// An unconditional jump.
    Goto,
    IfTrue,
    IfFalse,
    /// A switch case edge with its matched constant.
    SwitchCase(i32),
    SwitchDefault,
    /// Flow from a return statement to the exit marker.
    Return,
}

pub struct Cfg {
    method: MethodId,
    graph: DiGraph<StmtId, CfgEdgeKind>,
    node_map: HashMap<StmtId, NodeIndex<DefaultIx>>,
    entry: StmtId,
    exit: StmtId,
}

impl Cfg {
    /// Creates a CFG holding only the entry/exit markers of `method`.
    pub fn new(method: MethodId, entry: StmtId, exit: StmtId) -> Self {
        let mut cfg = Cfg {
            method,
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            entry,
            exit,
        };
        cfg.add_node(entry);
        cfg.add_node(exit);
        cfg
    }

    pub fn method(&self) -> MethodId {
        self.method
    }

    pub fn entry(&self) -> StmtId {
        self.entry
    }

    pub fn exit(&self) -> StmtId {
        self.exit
    }

    pub fn add_node(&mut self, stmt: StmtId) {
        if !self.node_map.contains_key(&stmt) {
            let idx = self.graph.add_node(stmt);
            self.node_map.insert(stmt, idx);
        }
    }

    pub fn add_edge(&mut self, src: StmtId, dst: StmtId, kind: CfgEdgeKind) {
        self.add_node(src);
        self.add_node(dst);
        let s = self.node_map[&src];
        let d = self.node_map[&dst];
        self.graph.add_edge(s, d, kind);
    }

    pub fn contains(&self, stmt: StmtId) -> bool {
        self.node_map.contains_key(&stmt)
    }

    /// Nodes in insertion order (entry first, exit second).
    pub fn nodes(&self) -> impl Iterator<Item = StmtId> + '_ {
        self.graph.node_weights().copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn preds_of(&self, stmt: StmtId) -> Vec<StmtId> {
        self.neighbors(stmt, Direction::Incoming)
    }

    pub fn succs_of(&self, stmt: StmtId) -> Vec<StmtId> {
        self.neighbors(stmt, Direction::Outgoing)
    }

    /// Outgoing edges with their kinds, for branch-sensitive traversals.
    pub fn out_edges_of(&self, stmt: StmtId) -> Vec<(CfgEdgeKind, StmtId)> {
        let Some(&idx) = self.node_map.get(&stmt) else {
            return Vec::new();
        };
        self.graph
            .edges(idx)
            .map(|e| (e.weight().clone(), self.graph[e.target()]))
            .collect()
    }

    /// All edges as `(src, dst, kind)` triples.
    pub fn edges(&self) -> Vec<(StmtId, StmtId, CfgEdgeKind)> {
        self.graph
            .edge_indices()
            .map(|e| {
                let (s, d) = self.graph.edge_endpoints(e).unwrap();
                (self.graph[s], self.graph[d], self.graph[e].clone())
            })
            .collect()
    }

    fn neighbors(&self, stmt: StmtId, dir: Direction) -> Vec<StmtId> {
        let Some(&idx) = self.node_map.get(&stmt) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n])
            .collect()
    }
}
