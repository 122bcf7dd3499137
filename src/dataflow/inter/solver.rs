// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Worklist solver for inter-procedural analyses.
//!
//! Inter-procedural workloads are heavy, so only the worklist algorithm is
//! provided; IN facts are recomputed per visit as the meet of the edge
//! transfers over all inbound edges.

use std::collections::VecDeque;

use log::*;

use super::InterDataflowAnalysis;
use crate::dataflow::fact::DataflowResult;
use crate::graph::icfg::Icfg;
use crate::ir::program::Program;

pub struct InterSolver<'p, A> {
    prog: &'p Program,
    icfg: &'p Icfg,
    analysis: A,
}

impl<'p, A: InterDataflowAnalysis> InterSolver<'p, A> {
    /// Panics if `analysis` is not a forward analysis.
    pub fn new(prog: &'p Program, icfg: &'p Icfg, analysis: A) -> Self {
        assert!(
            analysis.is_forward(),
            "the inter-procedural solver only supports forward analyses"
        );
        InterSolver {
            prog,
            icfg,
            analysis,
        }
    }

    pub fn solve(&mut self) -> DataflowResult<A::Fact> {
        let mut result = DataflowResult::new();
        for node in self.icfg.nodes() {
            result.set_in_fact(node, self.analysis.new_initial_fact());
            result.set_out_fact(node, self.analysis.new_initial_fact());
        }
        for &method in self.icfg.entry_methods() {
            let entry = self.prog.method(method).entry;
            let boundary = self.analysis.new_boundary_fact(entry);
            result.set_out_fact(entry, boundary);
        }

        let mut worklist: VecDeque<_> = self.icfg.nodes().collect();
        let mut visits = 0usize;
        while let Some(node) = worklist.pop_front() {
            visits += 1;
            let mut in_fact = self.analysis.new_initial_fact();
            for edge in self.icfg.in_edges_of(node) {
                let fact = self.analysis.transfer_edge(&edge, result.out_fact(edge.source));
                self.analysis.meet_into(&fact, &mut in_fact);
            }
            for reload in self.analysis.process_heap_store(node, &in_fact) {
                worklist.push_back(reload);
            }
            let changed = if self.prog.stmt(node).is_call() {
                self.analysis
                    .transfer_call_node(node, &in_fact, result.out_fact_mut(node))
            } else {
                self.analysis
                    .transfer_non_call_node(node, &in_fact, result.out_fact_mut(node))
            };
            result.set_in_fact(node, in_fact);
            if changed {
                for succ in self.icfg.succs_of(node) {
                    worklist.push_back(succ);
                }
            }
        }
        debug!("inter-procedural solver converged after {} node visits", visits);
        result
    }

    pub fn analysis(&self) -> &A {
        &self.analysis
    }
}
