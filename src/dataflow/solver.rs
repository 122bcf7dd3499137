// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Fixed-point solvers for intra-procedural analyses.
//!
//! Both solvers converge because the fact lattices have finite ascending
//! chains and transfers are monotone.

use std::collections::VecDeque;

use log::*;

use super::analysis::DataflowAnalysis;
use super::fact::DataflowResult;
use crate::graph::cfg::Cfg;

/// A worklist solver for forward analyses.
pub struct WorklistSolver<A> {
    analysis: A,
}

impl<A: DataflowAnalysis> WorklistSolver<A> {
    /// Panics if `analysis` is not a forward analysis.
    pub fn new(analysis: A) -> Self {
        assert!(
            analysis.is_forward(),
            "the worklist solver only supports forward analyses"
        );
        WorklistSolver { analysis }
    }

    pub fn solve(&self, cfg: &Cfg) -> DataflowResult<A::Fact> {
        let analysis = &self.analysis;
        let mut result = DataflowResult::new();
        for node in cfg.nodes() {
            result.set_in_fact(node, analysis.new_initial_fact());
            result.set_out_fact(node, analysis.new_initial_fact());
        }
        result.set_out_fact(cfg.entry(), analysis.new_boundary_fact(cfg));

        let mut worklist: VecDeque<_> = cfg.nodes().collect();
        let mut iterations = 0usize;
        while let Some(node) = worklist.pop_front() {
            iterations += 1;
            let mut in_fact = analysis.new_initial_fact();
            for pred in cfg.preds_of(node) {
                analysis.meet_into(result.out_fact(pred), &mut in_fact);
            }
            let changed = analysis.transfer_node(node, &in_fact, result.out_fact_mut(node));
            result.set_in_fact(node, in_fact);
            if changed {
                for succ in cfg.succs_of(node) {
                    worklist.push_back(succ);
                }
            }
        }
        debug!("worklist solver converged after {} node visits", iterations);
        result
    }
}

/// An iterative solver for backward analyses: full passes over the CFG
/// until one pass changes nothing.
pub struct IterativeSolver<A> {
    analysis: A,
}

impl<A: DataflowAnalysis> IterativeSolver<A> {
    /// Panics if `analysis` is not a backward analysis.
    pub fn new(analysis: A) -> Self {
        assert!(
            !analysis.is_forward(),
            "the iterative solver only supports backward analyses"
        );
        IterativeSolver { analysis }
    }

    pub fn solve(&self, cfg: &Cfg) -> DataflowResult<A::Fact> {
        let analysis = &self.analysis;
        let mut result = DataflowResult::new();
        for node in cfg.nodes() {
            result.set_in_fact(node, analysis.new_initial_fact());
            result.set_out_fact(node, analysis.new_initial_fact());
        }
        result.set_in_fact(cfg.exit(), analysis.new_boundary_fact(cfg));

        let mut passes = 0usize;
        loop {
            passes += 1;
            let mut changed = false;
            for node in cfg.nodes() {
                let mut out_fact = analysis.new_initial_fact();
                for succ in cfg.succs_of(node) {
                    analysis.meet_into(result.in_fact(succ), &mut out_fact);
                }
                changed |= analysis.transfer_node(node, &out_fact, result.in_fact_mut(node));
                result.set_out_fact(node, out_fact);
            }
            if !changed {
                break;
            }
        }
        debug!("iterative solver converged after {} passes", passes);
        result
    }
}
