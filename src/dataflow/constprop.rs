// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Intra-procedural constant propagation over integer-holding variables.

use super::analysis::DataflowAnalysis;
use super::fact::{CpFact, CpValue};
use crate::graph::cfg::Cfg;
use crate::ir::program::Program;
use crate::ir::stmt::{BinaryExp, BinaryOp, Exp, Operand, Stmt, StmtKind};
use crate::ir::{StmtId, VarId};

pub struct ConstantPropagation<'p> {
    prog: &'p Program,
}

impl<'p> ConstantPropagation<'p> {
    pub fn new(prog: &'p Program) -> Self {
        ConstantPropagation { prog }
    }

    /// Evaluates an expression against a fact.
    ///
    /// Expression kinds the lattice cannot see through (field/array access,
    /// cast, new) evaluate to `Nac`.
    pub fn evaluate(exp: &Exp, fact: &CpFact) -> CpValue {
        match exp {
            Exp::IntLiteral(v) => CpValue::Const(*v),
            Exp::Var(v) => fact.get(*v),
            Exp::Binary(b) => Self::evaluate_binary(b, fact),
            Exp::Field(_) | Exp::Array(_) | Exp::Cast { .. } | Exp::New(_) => CpValue::Nac,
        }
    }

    pub fn evaluate_binary(exp: &BinaryExp, fact: &CpFact) -> CpValue {
        let v1 = Self::evaluate_operand(exp.lhs, fact);
        let v2 = Self::evaluate_operand(exp.rhs, fact);
        // x / 0 and x % 0 never commit to a value; this takes precedence
        // over the NAC rule.
        if exp.op.may_trap_on_zero() && v2 == CpValue::Const(0) {
            return CpValue::Undef;
        }
        match (v1, v2) {
            (CpValue::Const(c1), CpValue::Const(c2)) => {
                CpValue::Const(Self::apply_op(exp.op, c1, c2))
            }
            _ if v1.is_nac() || v2.is_nac() => CpValue::Nac,
            _ => CpValue::Undef,
        }
    }

    fn evaluate_operand(op: Operand, fact: &CpFact) -> CpValue {
        match op {
            Operand::Var(v) => fact.get(v),
            Operand::IntLiteral(c) => CpValue::Const(c),
        }
    }

    // Signed 32-bit two's-complement semantics; shift amounts are masked
    // to 5 bits, comparisons yield 0/1.
    fn apply_op(op: BinaryOp, c1: i32, c2: i32) -> i32 {
        match op {
            BinaryOp::Add => c1.wrapping_add(c2),
            BinaryOp::Sub => c1.wrapping_sub(c2),
            BinaryOp::Mul => c1.wrapping_mul(c2),
            BinaryOp::Div => c1.wrapping_div(c2),
            BinaryOp::Rem => c1.wrapping_rem(c2),
            BinaryOp::Shl => c1.wrapping_shl(c2 as u32),
            BinaryOp::Shr => c1.wrapping_shr(c2 as u32),
            BinaryOp::UShr => (c1 as u32).wrapping_shr(c2 as u32) as i32,
            BinaryOp::And => c1 & c2,
            BinaryOp::Or => c1 | c2,
            BinaryOp::Xor => c1 ^ c2,
            BinaryOp::Eq => (c1 == c2) as i32,
            BinaryOp::Ne => (c1 != c2) as i32,
            BinaryOp::Lt => (c1 < c2) as i32,
            BinaryOp::Gt => (c1 > c2) as i32,
            BinaryOp::Le => (c1 <= c2) as i32,
            BinaryOp::Ge => (c1 >= c2) as i32,
        }
    }

    /// The defined variable and its new value, for statements that define
    /// an integer-holding variable.
    pub(crate) fn eval_stmt_def(&self, stmt: &Stmt, in_fact: &CpFact) -> Option<(VarId, CpValue)> {
        let lhs = stmt.def()?;
        if !self.prog.can_hold_int(lhs) {
            return None;
        }
        let value = match &stmt.kind {
            StmtKind::Assign { rhs, .. } => Self::evaluate(rhs, in_fact),
            StmtKind::Copy { rhs, .. } => in_fact.get(*rhs),
            StmtKind::New { .. }
            | StmtKind::LoadField { .. }
            | StmtKind::LoadArray { .. }
            | StmtKind::Invoke { .. } => CpValue::Nac,
            _ => unreachable!("definition statement without a value"),
        };
        Some((lhs, value))
    }

    /// Copies `in_fact` into `out_fact` with `lhs` rebound to `value`,
    /// reporting whether `out_fact` changed. The shared tail of every CP
    /// transfer, also used by the inter-procedural load transfers.
    pub(crate) fn transfer_def(
        in_fact: &CpFact,
        out_fact: &mut CpFact,
        def: Option<(VarId, CpValue)>,
    ) -> bool {
        let mut changed = false;
        match def {
            Some((lhs, value)) => {
                for (var, val) in in_fact.iter() {
                    if var != lhs {
                        changed |= out_fact.update(var, val);
                    }
                }
                changed |= out_fact.update(lhs, value);
            }
            None => {
                for (var, val) in in_fact.iter() {
                    changed |= out_fact.update(var, val);
                }
            }
        }
        changed
    }
}

impl<'p> DataflowAnalysis for ConstantPropagation<'p> {
    type Fact = CpFact;

    fn is_forward(&self) -> bool {
        true
    }

    /// Every integer-holding parameter is bound to `Nac` at the entry.
    fn new_boundary_fact(&self, cfg: &Cfg) -> CpFact {
        let mut fact = CpFact::new();
        for &param in &self.prog.method(cfg.method()).params {
            if self.prog.can_hold_int(param) {
                fact.update(param, CpValue::Nac);
            }
        }
        fact
    }

    fn new_initial_fact(&self) -> CpFact {
        CpFact::new()
    }

    fn meet_into(&self, fact: &CpFact, target: &mut CpFact) {
        for (var, value) in fact.iter() {
            target.update(var, CpValue::meet(value, target.get(var)));
        }
    }

    fn transfer_node(&self, stmt: StmtId, in_fact: &CpFact, out_fact: &mut CpFact) -> bool {
        let stmt = self.prog.stmt(stmt);
        let def = self.eval_stmt_def(stmt, in_fact);
        Self::transfer_def(in_fact, out_fact, def)
    }
}
