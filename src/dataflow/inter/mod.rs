// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Inter-procedural dataflow analysis over the ICFG.

pub mod constprop;
pub mod solver;

use crate::graph::icfg::IcfgEdge;
use crate::ir::StmtId;

/// An inter-procedural dataflow analysis: node transfers plus a transfer
/// per ICFG edge kind.
///
/// Call nodes get an identity transfer; the inter-procedural semantics
/// live on the `CallToReturn`/`Call`/`Return` edges.
pub trait InterDataflowAnalysis {
    type Fact: Clone + PartialEq;

    fn is_forward(&self) -> bool;

    /// The boundary fact of an entry method's entry node.
    fn new_boundary_fact(&self, entry: StmtId) -> Self::Fact;

    fn new_initial_fact(&self) -> Self::Fact;

    /// `target = target ⊓ fact`.
    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Transfer for call-site nodes; copies the fact through unchanged and
    /// reports whether OUT actually changed.
    fn transfer_call_node(
        &self,
        stmt: StmtId,
        in_fact: &Self::Fact,
        out_fact: &mut Self::Fact,
    ) -> bool;

    fn transfer_non_call_node(
        &self,
        stmt: StmtId,
        in_fact: &Self::Fact,
        out_fact: &mut Self::Fact,
    ) -> bool;

    /// The fact flowing along `edge` given the OUT fact of its source.
    fn transfer_edge(&self, edge: &IcfgEdge, out_fact: &Self::Fact) -> Self::Fact;

    /// Heap processing hook, run with the freshly met IN fact before the
    /// node transfer. Returns load statements to re-enqueue.
    fn process_heap_store(&mut self, stmt: StmtId, in_fact: &Self::Fact) -> Vec<StmtId> {
        let _ = (stmt, in_fact);
        Vec::new()
    }
}
