// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Backward live-variable analysis.

use super::analysis::DataflowAnalysis;
use super::fact::SetFact;
use crate::graph::cfg::Cfg;
use crate::ir::program::Program;
use crate::ir::{StmtId, VarId};

pub struct LiveVariableAnalysis<'p> {
    prog: &'p Program,
}

impl<'p> LiveVariableAnalysis<'p> {
    pub fn new(prog: &'p Program) -> Self {
        LiveVariableAnalysis { prog }
    }
}

impl<'p> DataflowAnalysis for LiveVariableAnalysis<'p> {
    type Fact = SetFact<VarId>;

    fn is_forward(&self) -> bool {
        false
    }

    fn new_boundary_fact(&self, _cfg: &Cfg) -> SetFact<VarId> {
        SetFact::new()
    }

    fn new_initial_fact(&self) -> SetFact<VarId> {
        SetFact::new()
    }

    fn meet_into(&self, fact: &SetFact<VarId>, target: &mut SetFact<VarId>) {
        target.union(fact);
    }

    // IN = uses(stmt) ∪ (OUT ∖ defs(stmt)); `in_fact` is the OUT set here
    // (the fact flowing into the backward transfer).
    fn transfer_node(
        &self,
        stmt: StmtId,
        in_fact: &SetFact<VarId>,
        out_fact: &mut SetFact<VarId>,
    ) -> bool {
        let stmt = self.prog.stmt(stmt);
        let mut new_fact = in_fact.clone();
        if let Some(def) = stmt.def() {
            new_fact.remove(def);
        }
        for used in stmt.uses() {
            new_fact.insert(used);
        }
        let changed = new_fact != *out_fact;
        *out_fact = new_fact;
        changed
    }
}
