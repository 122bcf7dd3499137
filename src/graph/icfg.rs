// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The inter-procedural control-flow graph.
//!
//! Nodes are the statements of all reachable methods; edges are tagged so
//! the inter-procedural solver can apply the right transfer per edge.
//! [`Icfg::build`] assembles the graph from per-method CFGs and a call
//! graph; the engine itself only traverses the result.

use std::collections::HashMap;

use itertools::Itertools;
use petgraph::graph::{DefaultIx, DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::call_graph::CallGraph;
use super::cfg::Cfg;
use crate::ir::program::Program;
use crate::ir::{MethodId, StmtId, VarId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IcfgEdgeKind {
    /// An intra-procedural edge.
    Normal,
    /// From a call site to its return site, bypassing the callee.
    CallToReturn,
    /// From a call site to a callee's entry.
    Call { callee: MethodId },
    /// From a callee's exit back to the return site, carrying the callee's
    /// returned variables.
    Return {
        call_site: StmtId,
        ret_vars: Vec<VarId>,
    },
}

/// An edge instance as handed to edge transfers.
#[derive(Clone, Debug)]
pub struct IcfgEdge {
    pub source: StmtId,
    pub target: StmtId,
    pub kind: IcfgEdgeKind,
}

pub struct Icfg {
    graph: DiGraph<StmtId, IcfgEdgeKind>,
    node_map: HashMap<StmtId, NodeIndex<DefaultIx>>,
    method_of: HashMap<StmtId, MethodId>,
    entry_methods: Vec<MethodId>,
}

impl Icfg {
    pub fn new() -> Self {
        Icfg {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            method_of: HashMap::new(),
            entry_methods: Vec::new(),
        }
    }

    /// Assembles the ICFG for the methods reachable in `call_graph`, using
    /// their CFGs. Call sites keep a `CallToReturn` edge per intra
    /// successor; resolved callees contribute `Call`/`Return` edges. Call
    /// sites without any resolved callee keep plain `Normal` edges.
    pub fn build(prog: &Program, cfgs: &[Cfg], call_graph: &CallGraph<MethodId, StmtId>) -> Icfg {
        let by_method: HashMap<MethodId, &Cfg> =
            cfgs.iter().map(|cfg| (cfg.method(), cfg)).collect();
        let mut icfg = Icfg::new();
        if let Some(main) = prog.entry_point() {
            icfg.entry_methods.push(main);
        }

        let methods = call_graph
            .reachable_methods()
            .filter(|m| by_method.contains_key(m))
            .collect_vec();
        for &m in &methods {
            for stmt in by_method[&m].nodes() {
                icfg.add_node(stmt, m);
            }
        }
        for &m in &methods {
            let cfg = by_method[&m];
            for (src, dst, _) in cfg.edges() {
                let is_call = !call_graph.callees_of(&src).is_empty();
                let kind = if is_call {
                    IcfgEdgeKind::CallToReturn
                } else {
                    IcfgEdgeKind::Normal
                };
                icfg.add_edge(src, dst, kind);
            }
            for site in cfg.nodes() {
                for callee in call_graph.callees_of(&site) {
                    let Some(_callee_cfg) = by_method.get(&callee) else {
                        continue;
                    };
                    let callee_m = prog.method(callee);
                    icfg.add_edge(site, callee_m.entry, IcfgEdgeKind::Call { callee });
                    for ret_site in cfg.succs_of(site) {
                        icfg.add_edge(
                            callee_m.exit,
                            ret_site,
                            IcfgEdgeKind::Return {
                                call_site: site,
                                ret_vars: callee_m.ret_vars.clone(),
                            },
                        );
                    }
                }
            }
        }
        icfg
    }

    pub fn add_node(&mut self, stmt: StmtId, method: MethodId) {
        if !self.node_map.contains_key(&stmt) {
            let idx = self.graph.add_node(stmt);
            self.node_map.insert(stmt, idx);
            self.method_of.insert(stmt, method);
        }
    }

    pub fn add_edge(&mut self, src: StmtId, dst: StmtId, kind: IcfgEdgeKind) {
        let s = self.node_map[&src];
        let d = self.node_map[&dst];
        self.graph.add_edge(s, d, kind);
    }

    pub fn add_entry_method(&mut self, method: MethodId) {
        self.entry_methods.push(method);
    }

    pub fn entry_methods(&self) -> &[MethodId] {
        &self.entry_methods
    }

    /// The method containing `stmt`.
    pub fn method_of(&self, stmt: StmtId) -> MethodId {
        self.method_of[&stmt]
    }

    pub fn contains(&self, stmt: StmtId) -> bool {
        self.node_map.contains_key(&stmt)
    }

    pub fn nodes(&self) -> impl Iterator<Item = StmtId> + '_ {
        self.graph.node_weights().copied()
    }

    pub fn in_edges_of(&self, stmt: StmtId) -> Vec<IcfgEdge> {
        let Some(&idx) = self.node_map.get(&stmt) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| IcfgEdge {
                source: self.graph[e.source()],
                target: self.graph[e.target()],
                kind: e.weight().clone(),
            })
            .collect()
    }

    pub fn succs_of(&self, stmt: StmtId) -> Vec<StmtId> {
        let Some(&idx) = self.node_map.get(&stmt) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect()
    }
}

impl Default for Icfg {
    fn default() -> Self {
        Self::new()
    }
}
