// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Dead-code detection.
//!
//! A statement is dead if it is unreachable from the CFG entry once
//! constant-folded branches prune edges, or if it is an assignment whose
//! result is never live and whose right-hand side has no observable side
//! effect.

use std::collections::{BTreeSet, HashSet, VecDeque};

use super::constprop::ConstantPropagation;
use super::fact::{CpFact, CpValue, DataflowResult, SetFact};
use crate::graph::cfg::{Cfg, CfgEdgeKind};
use crate::ir::program::Program;
use crate::ir::stmt::{Exp, StmtKind};
use crate::ir::{StmtId, VarId};

pub struct DeadCodeDetection;

impl DeadCodeDetection {
    /// Finds the dead statements of one method, given its CFG and the
    /// constant-propagation and live-variable results for it. The CFG exit
    /// is never reported. The result is ordered by statement id, which
    /// within one method is statement-index order.
    pub fn find(
        prog: &Program,
        cfg: &Cfg,
        constants: &DataflowResult<CpFact>,
        live_vars: &DataflowResult<SetFact<VarId>>,
    ) -> BTreeSet<StmtId> {
        let mut live_code: HashSet<StmtId> = HashSet::new();
        let mut seen: HashSet<StmtId> = HashSet::new();
        let mut queue: VecDeque<StmtId> = VecDeque::new();
        queue.push_back(cfg.entry());

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let stmt = prog.stmt(id);

            // A dead assignment passes reachability on to its successors
            // without itself becoming live.
            if let Some(lhs) = assigned_var(&stmt.kind) {
                if !live_vars.out_fact(id).contains(lhs) && has_no_side_effect(&stmt.kind) {
                    queue.extend(cfg.succs_of(id));
                    continue;
                }
            }
            live_code.insert(id);

            match &stmt.kind {
                StmtKind::If { cond } => {
                    let value = ConstantPropagation::evaluate_binary(cond, constants.in_fact(id));
                    match value.const_value() {
                        Some(c) => {
                            for (kind, target) in cfg.out_edges_of(id) {
                                if (c == 1 && kind == CfgEdgeKind::IfTrue)
                                    || (c == 0 && kind == CfgEdgeKind::IfFalse)
                                {
                                    queue.push_back(target);
                                }
                            }
                        }
                        None => queue.extend(cfg.succs_of(id)),
                    }
                }
                StmtKind::Switch { var } => {
                    let value =
                        ConstantPropagation::evaluate(&Exp::Var(*var), constants.in_fact(id));
                    match value.const_value() {
                        Some(c) => {
                            let edges = cfg.out_edges_of(id);
                            let mut hit = false;
                            for (kind, target) in &edges {
                                if *kind == CfgEdgeKind::SwitchCase(c) {
                                    hit = true;
                                    queue.push_back(*target);
                                }
                            }
                            if !hit {
                                for (kind, target) in &edges {
                                    if *kind == CfgEdgeKind::SwitchDefault {
                                        queue.push_back(*target);
                                    }
                                }
                            }
                        }
                        None => queue.extend(cfg.succs_of(id)),
                    }
                }
                _ => queue.extend(cfg.succs_of(id)),
            }
        }

        let mut dead: BTreeSet<StmtId> = cfg.nodes().filter(|n| !live_code.contains(n)).collect();
        dead.remove(&cfg.exit());
        dead
    }
}

/// The assigned variable of a non-call definition statement.
fn assigned_var(kind: &StmtKind) -> Option<VarId> {
    match kind {
        StmtKind::Assign { lhs, .. }
        | StmtKind::Copy { lhs, .. }
        | StmtKind::New { lhs, .. }
        | StmtKind::LoadField { lhs, .. }
        | StmtKind::LoadArray { lhs, .. } => Some(*lhs),
        _ => None,
    }
}

/// Whether executing the right-hand side can be observed: allocation, cast
/// failure, field/array access (class init, null dereference) and division
/// or remainder (zero divisor) all can.
fn has_no_side_effect(kind: &StmtKind) -> bool {
    match kind {
        StmtKind::Copy { .. } => true,
        StmtKind::New { .. } | StmtKind::LoadField { .. } | StmtKind::LoadArray { .. } => false,
        StmtKind::Assign { rhs, .. } => match rhs {
            Exp::New(_) | Exp::Cast { .. } | Exp::Field(_) | Exp::Array(_) => false,
            Exp::Binary(b) => !b.op.may_trap_on_zero(),
            Exp::IntLiteral(_) | Exp::Var(_) => true,
        },
        _ => true,
    }
}
