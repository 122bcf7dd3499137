// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! CHA call-graph construction.

mod common;

use common::new_main;
use opta::builder::cha_builder::ChaBuilder;
use opta::graph::call_graph::{CallGraph, CallKind};
use opta::ir::program::Program;
use opta::ir::stmt::{InvokeExp, InvokeKind, MethodRef, StmtKind};
use opta::ir::types::Type;

#[test]
fn virtual_dispatch_over_subhierarchy() {
    let mut prog = Program::new();
    let (_, _main) = new_main(&mut prog);
    let a = prog.add_class("A", None, false);
    let b = prog.add_class("B", Some(a), false);
    let _c = prog.add_class("C", Some(a), false);
    let a_foo = prog.add_method(a, "foo()", false, Type::Void);
    let b_foo = prog.add_method(b, "foo()", false, Type::Void);
    let foo = prog.subsig("foo()");

    let recv = prog.new_var(_main, "a", Type::Reference(a));
    let builder = ChaBuilder::new(&prog);
    let exp = InvokeExp {
        kind: InvokeKind::Virtual,
        method_ref: MethodRef {
            class: a,
            subsig: foo,
        },
        base: Some(recv),
        args: Vec::new(),
    };
    // C inherits A.foo, contributing A.foo again; deduplicated.
    assert_eq!(builder.resolve(&exp), vec![a_foo, b_foo]);
}

#[test]
fn abstract_declarations_dispatch_upwards() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let a = prog.add_class("A", None, false);
    let b = prog.add_class("B", Some(a), false);
    let a_foo = prog.add_method(a, "foo()", false, Type::Void);
    let _b_foo_abstract = prog.add_method(b, "foo()", true, Type::Void);
    let foo = prog.subsig("foo()");

    let recv = prog.new_var(main, "b", Type::Reference(b));
    let builder = ChaBuilder::new(&prog);
    let exp = InvokeExp {
        kind: InvokeKind::Virtual,
        method_ref: MethodRef {
            class: b,
            subsig: foo,
        },
        base: Some(recv),
        args: Vec::new(),
    };
    assert_eq!(builder.resolve(&exp), vec![a_foo]);
}

#[test]
fn builds_call_graph_from_entry() {
    let mut prog = Program::new();
    let (_, main) = new_main(&mut prog);
    let a = prog.add_class("A", None, false);
    let b = prog.add_class("B", Some(a), false);
    let a_foo = prog.add_method(a, "foo()", false, Type::Void);
    let b_foo = prog.add_method(b, "foo()", false, Type::Void);
    let foo = prog.subsig("foo()");

    let recv = prog.new_var(main, "a", Type::Reference(a));
    let _s_new = prog.add_stmt(
        main,
        StmtKind::New {
            lhs: recv,
            ty: Type::Reference(a),
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
                base: Some(recv),
                args: Vec::new(),
            },
        },
    );

    let call_graph = ChaBuilder::new(&prog).build();
    let mut callees = call_graph.callees_of(&site);
    callees.sort();
    assert_eq!(callees, vec![a_foo, b_foo]);
    let reachable: Vec<_> = call_graph.reachable_methods().collect();
    assert!(reachable.contains(&main));
    assert!(reachable.contains(&a_foo));
    assert!(reachable.contains(&b_foo));
}

#[test]
fn edges_are_deduplicated_and_monotone() {
    let mut prog = Program::new();
    let (class, main) = new_main(&mut prog);
    let callee = prog.add_method(class, "f()", false, Type::Void);
    let f = prog.subsig("f()");
    let site = prog.add_stmt(
        main,
        StmtKind::Invoke {
            result: None,
            exp: InvokeExp {
                kind: InvokeKind::Static,
                method_ref: MethodRef { class, subsig: f },
                base: None,
                args: Vec::new(),
            },
        },
    );

    let mut cg: CallGraph<_, _> = CallGraph::new();
    assert!(cg.add_edge(CallKind::Static, site, main, callee));
    assert!(!cg.add_edge(CallKind::Static, site, main, callee));
    assert_eq!(cg.edge_count(), 1);
    assert_eq!(cg.callees_of(&site), vec![callee]);
    assert_eq!(cg.callers_of(callee), vec![(CallKind::Static, site)]);
}
