// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Intra-procedural dataflow scenarios: constant propagation, liveness
//! driven dead code, and solver convergence.

mod common;

use common::{int_ty, linear_cfg, new_main};
use opta::dataflow::analysis::DataflowAnalysis;
use opta::dataflow::constprop::ConstantPropagation;
use opta::dataflow::deadcode::DeadCodeDetection;
use opta::dataflow::fact::{CpFact, CpValue};
use opta::dataflow::liveness::LiveVariableAnalysis;
use opta::dataflow::solver::{IterativeSolver, WorklistSolver};
use opta::graph::cfg::{Cfg, CfgEdgeKind};
use opta::ir::program::Program;
use opta::ir::stmt::{BinaryExp, BinaryOp, Exp, Operand, StmtKind};

#[test]
fn constant_arithmetic_propagates() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let a = prog.new_var(main, "a", int_ty());
    let b = prog.new_var(main, "b", int_ty());
    let c = prog.new_var(main, "c", int_ty());
    let s1 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: a,
            rhs: Exp::IntLiteral(1),
        },
    );
    let s2 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: b,
            rhs: Exp::IntLiteral(2),
        },
    );
    let s3 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: c,
            rhs: Exp::Binary(BinaryExp {
                op: BinaryOp::Add,
                lhs: Operand::Var(a),
                rhs: Operand::Var(b),
            }),
        },
    );
    let cfg = linear_cfg(&prog, main, &[s1, s2, s3]);

    let solver = WorklistSolver::new(ConstantPropagation::new(&prog));
    let result = solver.solve(&cfg);

    let out = result.out_fact(s3);
    assert_eq!(out.get(a), CpValue::Const(1));
    assert_eq!(out.get(b), CpValue::Const(2));
    assert_eq!(out.get(c), CpValue::Const(3));
}

#[test]
fn division_by_zero_never_commits() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let a = prog.new_var(main, "a", int_ty());
    let b = prog.new_var(main, "b", int_ty());
    let c = prog.new_var(main, "c", int_ty());
    let s1 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: a,
            rhs: Exp::IntLiteral(1),
        },
    );
    let s2 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: b,
            rhs: Exp::IntLiteral(0),
        },
    );
    let s3 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: c,
            rhs: Exp::Binary(BinaryExp {
                op: BinaryOp::Div,
                lhs: Operand::Var(a),
                rhs: Operand::Var(b),
            }),
        },
    );
    let cfg = linear_cfg(&prog, main, &[s1, s2, s3]);

    let solver = WorklistSolver::new(ConstantPropagation::new(&prog));
    let result = solver.solve(&cfg);
    assert_eq!(result.out_fact(s3).get(c), CpValue::Undef);
}

#[test]
fn transfer_is_idempotent_on_unchanged_input() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let a = prog.new_var(main, "a", int_ty());
    let s1 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: a,
            rhs: Exp::IntLiteral(5),
        },
    );
    let cp = ConstantPropagation::new(&prog);
    let in_fact = CpFact::new();
    let mut out_fact = CpFact::new();
    assert!(cp.transfer_node(s1, &in_fact, &mut out_fact));
    let snapshot = out_fact.clone();
    assert!(!cp.transfer_node(s1, &in_fact, &mut out_fact));
    assert_eq!(out_fact, snapshot);
}

#[test]
fn loop_join_converges_to_nac() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let x = prog.new_var(main, "x", int_ty());
    let s0 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: x,
            rhs: Exp::IntLiteral(0),
        },
    );
    let s1 = prog.add_stmt(
        main,
        StmtKind::If {
            cond: BinaryExp {
                op: BinaryOp::Lt,
                lhs: Operand::Var(x),
                rhs: Operand::IntLiteral(10),
            },
        },
    );
    let s2 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: x,
            rhs: Exp::Binary(BinaryExp {
                op: BinaryOp::Add,
                lhs: Operand::Var(x),
                rhs: Operand::IntLiteral(1),
            }),
        },
    );
    let s3 = prog.add_stmt(main, StmtKind::Return { value: Some(x) });

    let m = prog.method(main);
    let mut cfg = Cfg::new(main, m.entry, m.exit);
    cfg.add_edge(m.entry, s0, CfgEdgeKind::Entry);
    cfg.add_edge(s0, s1, CfgEdgeKind::Fallthrough);
    cfg.add_edge(s1, s2, CfgEdgeKind::IfTrue);
    cfg.add_edge(s2, s1, CfgEdgeKind::Goto);
    cfg.add_edge(s1, s3, CfgEdgeKind::IfFalse);
    cfg.add_edge(s3, m.exit, CfgEdgeKind::Return);

    let cp = ConstantPropagation::new(&prog);
    let solver = WorklistSolver::new(ConstantPropagation::new(&prog));
    let result = solver.solve(&cfg);

    // The loop joins x = 0 with x = x + 1, so x is NAC at the loop head.
    assert_eq!(result.in_fact(s3).get(x), CpValue::Nac);

    // Convergence: IN[n] equals the meet of the predecessors' OUTs.
    for node in cfg.nodes() {
        let mut expected = cp.new_initial_fact();
        for pred in cfg.preds_of(node) {
            cp.meet_into(result.out_fact(pred), &mut expected);
        }
        assert_eq!(&expected, result.in_fact(node));
    }
}

#[test]
fn overwritten_assignment_is_dead() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let x = prog.new_var(main, "x", int_ty());
    let s1 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: x,
            rhs: Exp::IntLiteral(5),
        },
    );
    let s2 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: x,
            rhs: Exp::IntLiteral(6),
        },
    );
    let s3 = prog.add_stmt(main, StmtKind::Return { value: Some(x) });
    let cfg = linear_cfg(&prog, main, &[s1, s2, s3]);

    let constants = WorklistSolver::new(ConstantPropagation::new(&prog)).solve(&cfg);
    let live = IterativeSolver::new(LiveVariableAnalysis::new(&prog)).solve(&cfg);
    let dead = DeadCodeDetection::find(&prog, &cfg, &constants, &live);

    assert!(dead.contains(&s1));
    assert!(!dead.contains(&s2));
    assert!(!dead.contains(&s3));
}

#[test]
fn constant_folded_branch_kills_else_arm() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let y = prog.new_var(main, "y", int_ty());
    let s_if = prog.add_stmt(
        main,
        StmtKind::If {
            cond: BinaryExp {
                op: BinaryOp::Eq,
                lhs: Operand::IntLiteral(1),
                rhs: Operand::IntLiteral(1),
            },
        },
    );
    let s_then = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: y,
            rhs: Exp::IntLiteral(1),
        },
    );
    let s_else = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: y,
            rhs: Exp::IntLiteral(2),
        },
    );
    let s_ret = prog.add_stmt(main, StmtKind::Return { value: Some(y) });

    let m = prog.method(main);
    let mut cfg = Cfg::new(main, m.entry, m.exit);
    cfg.add_edge(m.entry, s_if, CfgEdgeKind::Entry);
    cfg.add_edge(s_if, s_then, CfgEdgeKind::IfTrue);
    cfg.add_edge(s_if, s_else, CfgEdgeKind::IfFalse);
    cfg.add_edge(s_then, s_ret, CfgEdgeKind::Goto);
    cfg.add_edge(s_else, s_ret, CfgEdgeKind::Fallthrough);
    cfg.add_edge(s_ret, m.exit, CfgEdgeKind::Return);

    let constants = WorklistSolver::new(ConstantPropagation::new(&prog)).solve(&cfg);
    let live = IterativeSolver::new(LiveVariableAnalysis::new(&prog)).solve(&cfg);
    let dead = DeadCodeDetection::find(&prog, &cfg, &constants, &live);

    assert!(dead.contains(&s_else));
    assert!(!dead.contains(&s_then));
    assert!(!dead.contains(&s_ret));

    // Idempotence: a second run yields the identical set.
    let again = DeadCodeDetection::find(&prog, &cfg, &constants, &live);
    assert_eq!(dead, again);
}

#[test]
fn constant_switch_takes_matching_case() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let x = prog.new_var(main, "x", int_ty());
    let y = prog.new_var(main, "y", int_ty());
    let s0 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: x,
            rhs: Exp::IntLiteral(2),
        },
    );
    let s_switch = prog.add_stmt(main, StmtKind::Switch { var: x });
    let case1 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: y,
            rhs: Exp::IntLiteral(10),
        },
    );
    let case2 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: y,
            rhs: Exp::IntLiteral(20),
        },
    );
    let dfl = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: y,
            rhs: Exp::IntLiteral(30),
        },
    );
    let s_ret = prog.add_stmt(main, StmtKind::Return { value: Some(y) });

    let m = prog.method(main);
    let mut cfg = Cfg::new(main, m.entry, m.exit);
    cfg.add_edge(m.entry, s0, CfgEdgeKind::Entry);
    cfg.add_edge(s0, s_switch, CfgEdgeKind::Fallthrough);
    cfg.add_edge(s_switch, case1, CfgEdgeKind::SwitchCase(1));
    cfg.add_edge(s_switch, case2, CfgEdgeKind::SwitchCase(2));
    cfg.add_edge(s_switch, dfl, CfgEdgeKind::SwitchDefault);
    cfg.add_edge(case1, s_ret, CfgEdgeKind::Goto);
    cfg.add_edge(case2, s_ret, CfgEdgeKind::Goto);
    cfg.add_edge(dfl, s_ret, CfgEdgeKind::Fallthrough);
    cfg.add_edge(s_ret, m.exit, CfgEdgeKind::Return);

    let constants = WorklistSolver::new(ConstantPropagation::new(&prog)).solve(&cfg);
    let live = IterativeSolver::new(LiveVariableAnalysis::new(&prog)).solve(&cfg);
    let dead = DeadCodeDetection::find(&prog, &cfg, &constants, &live);

    assert!(dead.contains(&case1));
    assert!(dead.contains(&dfl));
    assert!(!dead.contains(&case2));
}

#[test]
#[should_panic(expected = "forward analyses")]
fn worklist_solver_rejects_backward_analyses() {
    let prog = Program::new();
    let _ = WorklistSolver::new(LiveVariableAnalysis::new(&prog));
}

#[test]
#[should_panic(expected = "backward analyses")]
fn iterative_solver_rejects_forward_analyses() {
    let prog = Program::new();
    let _ = IterativeSolver::new(ConstantPropagation::new(&prog));
}

#[test]
fn liveness_flows_backwards() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let x = prog.new_var(main, "x", int_ty());
    let y = prog.new_var(main, "y", int_ty());
    let s1 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: x,
            rhs: Exp::IntLiteral(1),
        },
    );
    let s2 = prog.add_stmt(
        main,
        StmtKind::Assign {
            lhs: y,
            rhs: Exp::Binary(BinaryExp {
                op: BinaryOp::Add,
                lhs: Operand::Var(x),
                rhs: Operand::IntLiteral(1),
            }),
        },
    );
    let s3 = prog.add_stmt(main, StmtKind::Return { value: Some(y) });
    let cfg = linear_cfg(&prog, main, &[s1, s2, s3]);

    let live = IterativeSolver::new(LiveVariableAnalysis::new(&prog)).solve(&cfg);
    // x is live after its definition (used by s2), dead after s2.
    assert!(live.out_fact(s1).contains(x));
    assert!(!live.out_fact(s2).contains(x));
    assert!(live.out_fact(s2).contains(y));
}
