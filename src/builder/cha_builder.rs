// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Call-graph construction by class-hierarchy analysis.
//!
//! Virtual and interface call sites are over-approximated by walking the
//! static sub-hierarchy of the declared receiver class; every visited
//! class contributes its dispatch target.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use itertools::Itertools;
use log::*;

use crate::graph::call_graph::CallGraph;
use crate::ir::program::Program;
use crate::ir::stmt::{InvokeExp, InvokeKind};
use crate::ir::{ClassId, MethodId, StmtId};
use crate::pta::call_kind;

pub struct ChaBuilder<'p> {
    prog: &'p Program,
}

impl<'p> ChaBuilder<'p> {
    pub fn new(prog: &'p Program) -> Self {
        ChaBuilder { prog }
    }

    /// Builds the call graph of everything reachable from the entry point.
    pub fn build(&self) -> CallGraph<MethodId, StmtId> {
        let now = Instant::now();
        let prog = self.prog;
        let entry = prog
            .entry_point()
            .expect("CHA requires an entry point");
        let mut call_graph = CallGraph::new();
        call_graph.add_node(entry);

        let mut cursor = call_graph.reach_cursor();
        while let Some(method) = call_graph.reach_next(&mut cursor) {
            if prog.method(method).is_abstract {
                continue;
            }
            for &stmt in prog.stmts_of(method) {
                let Some((exp, _)) = prog.stmt(stmt).as_invoke() else {
                    continue;
                };
                for callee in self.resolve(exp) {
                    call_graph.add_edge(call_kind(exp.kind), stmt, method, callee);
                }
            }
        }
        info!(
            "CHA call graph built in {}: {} methods, {} edges",
            humantime::format_duration(now.elapsed()),
            call_graph.method_count(),
            call_graph.edge_count()
        );
        call_graph
    }

    /// Resolves the possible targets of a call site via the class
    /// hierarchy, deduplicated in discovery order.
    pub fn resolve(&self, exp: &InvokeExp) -> Vec<MethodId> {
        let prog = self.prog;
        let mref = exp.method_ref;
        let mut targets = Vec::new();
        match exp.kind {
            InvokeKind::Static => {
                targets.extend(prog.declared_method(mref.class, mref.subsig));
            }
            InvokeKind::Special => {
                targets.extend(prog.dispatch(mref.class, mref.subsig));
            }
            InvokeKind::Virtual | InvokeKind::Interface => {
                let mut visited = HashSet::new();
                let mut queue: VecDeque<ClassId> = VecDeque::new();
                queue.push_back(mref.class);
                while let Some(class) = queue.pop_front() {
                    if !visited.insert(class) {
                        continue;
                    }
                    targets.extend(prog.dispatch(class, mref.subsig));
                    if prog.class(class).is_interface {
                        queue.extend(prog.direct_subinterfaces_of(class).iter().copied());
                        queue.extend(prog.direct_implementors_of(class).iter().copied());
                    } else {
                        queue.extend(prog.direct_subclasses_of(class).iter().copied());
                    }
                }
            }
        }
        // Subclasses without an overriding declaration dispatch to the same
        // inherited target; keep the first occurrence only.
        targets.into_iter().unique().collect()
    }
}
