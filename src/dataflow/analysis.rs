// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use crate::graph::cfg::Cfg;
use crate::ir::StmtId;

/// The common shape of an intra-procedural dataflow analysis.
///
/// For a forward analysis the solver maintains `IN[n] = ⊓ OUT[preds]` and
/// `OUT[n] = transfer(IN[n])`; a backward analysis swaps the roles, so
/// `transfer_node` always receives the fact flowing *into* the transfer as
/// `in_fact` and updates the fact flowing *out of* it, whichever program
/// direction that is.
pub trait DataflowAnalysis {
    type Fact: Clone + PartialEq;

    fn is_forward(&self) -> bool;

    /// The fact at the CFG boundary (entry for forward, exit for backward).
    fn new_boundary_fact(&self, cfg: &Cfg) -> Self::Fact;

    /// The initial fact of every other node; the bottom element, also used
    /// as the identity of empty meets.
    fn new_initial_fact(&self) -> Self::Fact;

    /// `target = target ⊓ fact`.
    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Applies the node transfer; returns true iff `out_fact` changed.
    /// Transfers must be monotone for the solvers to converge.
    fn transfer_node(&self, stmt: StmtId, in_fact: &Self::Fact, out_fact: &mut Self::Fact)
        -> bool;
}
