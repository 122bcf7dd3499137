// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Andersen points-to analysis, context-insensitive and context-sensitive.

mod common;

use common::new_main;
use opta::ir::program::Program;
use opta::ir::stmt::{ArrayAccess, FieldAccess, InvokeExp, InvokeKind, MethodRef, StmtKind};
use opta::ir::types::Type;
use opta::ir::{MethodId, VarId};
use opta::pta::andersen::AndersenPointerAnalysis;
use opta::pta::context_sensitive::ContextSensitivePointerAnalysis;
use opta::pta::context_strategy::KCallSiteSensitive;
use opta::pta::result::PointerAnalysisResult;
use opta::pta::PointerAnalysis;

fn solve_ci(prog: &Program) -> PointerAnalysisResult {
    let mut pta = AndersenPointerAnalysis::new(prog);
    pta.analyze();
    pta.into_result()
}

fn pts(result: &PointerAnalysisResult, var: VarId) -> Vec<opta::pta::heap::ObjId> {
    let mut objs: Vec<_> = result.points_to(var).collect();
    objs.sort();
    objs
}

/// `id(w) { return w; }` on class `Main`, with a reference parameter.
fn add_identity_method(prog: &mut Program, class: opta::ir::ClassId, param_ty: Type) -> MethodId {
    let id = prog.add_method(class, "id(A)", false, param_ty.clone());
    let w = prog.new_var(id, "w", param_ty);
    prog.add_param(id, w);
    prog.add_stmt(id, StmtKind::Return { value: Some(w) });
    id
}

#[test]
fn copies_share_points_to_sets() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let a = prog.add_class("A", None, false);
    let a_ty = Type::Reference(a);
    let x = prog.new_var(main, "x", a_ty.clone());
    let y = prog.new_var(main, "y", a_ty.clone());
    let z = prog.new_var(main, "z", a_ty.clone());
    prog.add_stmt(main, StmtKind::New { lhs: x, ty: a_ty });
    prog.add_stmt(main, StmtKind::Copy { lhs: y, rhs: x });
    prog.add_stmt(main, StmtKind::Copy { lhs: z, rhs: y });

    let result = solve_ci(&prog);
    let xs = pts(&result, x);
    assert_eq!(xs.len(), 1);
    // Inclusion along the copy chain: x ⊆ y ⊆ z.
    assert_eq!(pts(&result, y), xs);
    assert_eq!(pts(&result, z), xs);
}

#[test]
fn virtual_calls_devirtualize_on_receiver_objects() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let a = prog.add_class("A", None, false);
    let b = prog.add_class("B", Some(a), false);
    let _a_foo = prog.add_method(a, "foo()", false, Type::Void);
    let b_foo = prog.add_method(b, "foo()", false, Type::Void);
    let this_b = prog.new_var(b_foo, "this", Type::Reference(b));
    prog.set_this(b_foo, this_b);
    let foo = prog.subsig("foo()");

    let r = prog.new_var(main, "r", Type::Reference(a));
    prog.add_stmt(
        main,
        StmtKind::New {
            lhs: r,
            ty: Type::Reference(b),
        },
    );
    let site = prog.add_stmt(
        main,
        StmtKind::Invoke {
            result: None,
            exp: InvokeExp {
                kind: InvokeKind::Virtual,
                method_ref: MethodRef {
                    class: a,
                    subsig: foo,
                },
                base: Some(r),
                args: Vec::new(),
            },
        },
    );

    let result = solve_ci(&prog);
    // Unlike CHA, only the dynamic type's target is called.
    assert_eq!(result.call_graph().callees_of(&site), vec![b_foo]);
    // The receiver object is bound to the callee's `this`.
    assert_eq!(pts(&result, this_b), pts(&result, r));
}

#[test]
fn field_stores_flow_to_aliased_loads() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let a = prog.add_class("A", None, false);
    let b = prog.add_class("B", None, false);
    let f = prog.add_field(a, "f", Type::Reference(b));
    let a_ty = Type::Reference(a);
    let p = prog.new_var(main, "p", a_ty.clone());
    let q = prog.new_var(main, "q", a_ty.clone());
    let o = prog.new_var(main, "o", Type::Reference(b));
    let r = prog.new_var(main, "r", Type::Reference(b));
    prog.add_stmt(main, StmtKind::New { lhs: p, ty: a_ty });
    prog.add_stmt(main, StmtKind::Copy { lhs: q, rhs: p });
    prog.add_stmt(
        main,
        StmtKind::New {
            lhs: o,
            ty: Type::Reference(b),
        },
    );
    prog.add_stmt(
        main,
        StmtKind::StoreField {
            access: FieldAccess {
                base: Some(p),
                field: f,
            },
            rhs: o,
        },
    );
    prog.add_stmt(
        main,
        StmtKind::LoadField {
            lhs: r,
            access: FieldAccess {
                base: Some(q),
                field: f,
            },
        },
    );

    let result = solve_ci(&prog);
    assert_eq!(pts(&result, r), pts(&result, o));
}

#[test]
fn static_fields_and_arrays_flow() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let a = prog.add_class("A", None, false);
    let holder = prog.add_class("Holder", None, false);
    let g = prog.add_field(holder, "g", Type::Reference(a));
    let a_ty = Type::Reference(a);
    let arr_ty = Type::Array(Box::new(a_ty.clone()));

    let x = prog.new_var(main, "x", a_ty.clone());
    let y = prog.new_var(main, "y", a_ty.clone());
    let arr = prog.new_var(main, "arr", arr_ty.clone());
    let i = prog.new_var(main, "i", common::int_ty());
    let z = prog.new_var(main, "z", a_ty.clone());

    prog.add_stmt(main, StmtKind::New { lhs: x, ty: a_ty });
    prog.add_stmt(
        main,
        StmtKind::StoreField {
            access: FieldAccess {
                base: None,
                field: g,
            },
            rhs: x,
        },
    );
    prog.add_stmt(
        main,
        StmtKind::LoadField {
            lhs: y,
            access: FieldAccess {
                base: None,
                field: g,
            },
        },
    );
    prog.add_stmt(main, StmtKind::New { lhs: arr, ty: arr_ty });
    prog.add_stmt(
        main,
        StmtKind::StoreArray {
            access: ArrayAccess {
                base: arr,
                index: i,
            },
            rhs: x,
        },
    );
    prog.add_stmt(
        main,
        StmtKind::LoadArray {
            lhs: z,
            access: ArrayAccess {
                base: arr,
                index: i,
            },
        },
    );

    let result = solve_ci(&prog);
    assert_eq!(pts(&result, y), pts(&result, x));
    assert_eq!(pts(&result, z), pts(&result, x));
}

#[test]
fn context_insensitive_merges_call_sites() {
    let mut prog = Program::new();
    let (class, main) = new_main(&mut prog);
    let a = prog.add_class("A", None, false);
    let a_ty = Type::Reference(a);
    let _id = add_identity_method(&mut prog, class, a_ty.clone());
    let id_sig = prog.subsig("id(A)");

    let o1 = prog.new_var(main, "o1", a_ty.clone());
    let o2 = prog.new_var(main, "o2", a_ty.clone());
    let p = prog.new_var(main, "p", a_ty.clone());
    let q = prog.new_var(main, "q", a_ty.clone());
    prog.add_stmt(
        main,
        StmtKind::New {
            lhs: o1,
            ty: a_ty.clone(),
        },
    );
    prog.add_stmt(main, StmtKind::New { lhs: o2, ty: a_ty });
    for (lhs, arg) in [(p, o1), (q, o2)] {
        prog.add_stmt(
            main,
            StmtKind::Invoke {
                result: Some(lhs),
                exp: InvokeExp {
                    kind: InvokeKind::Static,
                    method_ref: MethodRef {
                        class,
                        subsig: id_sig,
                    },
                    base: None,
                    args: vec![arg],
                },
            },
        );
    }

    let result = solve_ci(&prog);
    assert_eq!(pts(&result, p).len(), 2);
    assert_eq!(pts(&result, q).len(), 2);
}

#[test]
fn one_call_site_sensitivity_separates_call_sites() {
    let mut prog = Program::new();
    let (class, main) = new_main(&mut prog);
    let a = prog.add_class("A", None, false);
    let a_ty = Type::Reference(a);
    let _id = add_identity_method(&mut prog, class, a_ty.clone());
    let id_sig = prog.subsig("id(A)");

    let o1 = prog.new_var(main, "o1", a_ty.clone());
    let o2 = prog.new_var(main, "o2", a_ty.clone());
    let p = prog.new_var(main, "p", a_ty.clone());
    let q = prog.new_var(main, "q", a_ty.clone());
    prog.add_stmt(
        main,
        StmtKind::New {
            lhs: o1,
            ty: a_ty.clone(),
        },
    );
    prog.add_stmt(main, StmtKind::New { lhs: o2, ty: a_ty });
    for (lhs, arg) in [(p, o1), (q, o2)] {
        prog.add_stmt(
            main,
            StmtKind::Invoke {
                result: Some(lhs),
                exp: InvokeExp {
                    kind: InvokeKind::Static,
                    method_ref: MethodRef {
                        class,
                        subsig: id_sig,
                    },
                    base: None,
                    args: vec![arg],
                },
            },
        );
    }

    let mut pta = ContextSensitivePointerAnalysis::new(&prog, KCallSiteSensitive::new(1));
    pta.analyze();
    let result = pta.into_result();

    assert_eq!(pts(&result, p), pts(&result, o1));
    assert_eq!(pts(&result, q), pts(&result, o2));
    assert_eq!(pts(&result, p).len(), 1);
    assert_ne!(pts(&result, p), pts(&result, q));
}
