// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Shared helpers for building small IR programs through the public API.

#![allow(dead_code)]

use opta::graph::cfg::{Cfg, CfgEdgeKind};
use opta::ir::program::Program;
use opta::ir::types::{PrimitiveType, Type};
use opta::ir::{ClassId, MethodId, StmtId};

pub fn int_ty() -> Type {
    Type::Primitive(PrimitiveType::Int)
}

/// A `Main` class with an entry method `main()`.
pub fn new_main(prog: &mut Program) -> (ClassId, MethodId) {
    let class = prog.add_class("Main", None, false);
    let main = prog.add_method(class, "main()", false, Type::Void);
    prog.set_entry_point(main);
    (class, main)
}

/// Chains `stmts` between the entry and exit markers of `method`.
pub fn linear_cfg(prog: &Program, method: MethodId, stmts: &[StmtId]) -> Cfg {
    let m = prog.method(method);
    let mut cfg = Cfg::new(method, m.entry, m.exit);
    let mut prev = m.entry;
    let mut kind = CfgEdgeKind::Entry;
    for &stmt in stmts {
        cfg.add_edge(prev, stmt, kind);
        prev = stmt;
        kind = CfgEdgeKind::Fallthrough;
    }
    cfg.add_edge(prev, m.exit, CfgEdgeKind::Return);
    cfg
}
