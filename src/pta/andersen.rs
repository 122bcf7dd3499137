// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context-insensitive Andersen-style points-to analysis.
//!
//! The pointer flow graph and the call graph grow together: statements of
//! newly reachable methods seed constraints eagerly, while instance field,
//! array and instance-call constraints attach lazily as receiver variables
//! acquire objects.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Instant;

use log::*;

use super::heap::{HeapManager, ObjId};
use super::result::PointerAnalysisResult;
use super::{call_kind, PointerAnalysis, PointsTo};
use crate::graph::call_graph::CallGraph;
use crate::graph::pfg::{PfgNodeId, PointerFlowGraph};
use crate::ir::program::Program;
use crate::ir::stmt::{InvokeKind, StmtKind};
use crate::ir::{FieldId, MethodId, StmtId, VarId};
use crate::pts_set::points_to::PointsToSet;
use crate::pts_set::pt_data::PointsToData;
use crate::util::mono_queue::Cursor;

/// A node of the context-insensitive pointer flow graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Pointer {
    Var(VarId),
    StaticField(FieldId),
    InstanceField(ObjId, FieldId),
    ArrayIndex(ObjId),
}

pub struct AndersenPointerAnalysis<'p> {
    prog: &'p Program,
    heap: HeapManager,
    pfg: PointerFlowGraph<Pointer>,
    pt_data: PointsToData<PfgNodeId, ObjId, PointsTo<ObjId>>,
    pub call_graph: CallGraph<MethodId, StmtId>,
    worklist: VecDeque<(PfgNodeId, PointsTo<ObjId>)>,
    reach_cursor: Cursor,
    processed: HashSet<MethodId>,
}

impl<'p> AndersenPointerAnalysis<'p> {
    pub fn new(prog: &'p Program) -> Self {
        let call_graph = CallGraph::new();
        let reach_cursor = call_graph.reach_cursor();
        AndersenPointerAnalysis {
            prog,
            heap: HeapManager::new(),
            pfg: PointerFlowGraph::new(),
            pt_data: PointsToData::new(),
            call_graph,
            worklist: VecDeque::new(),
            reach_cursor,
            processed: HashSet::new(),
        }
    }

    /// Seeds the analysis with the entry point.
    fn initialize(&mut self) {
        let entry = self
            .prog
            .entry_point()
            .expect("points-to analysis requires an entry point");
        self.call_graph.add_node(entry);
        self.process_reach_methods();
    }

    /// Processes the statements of methods that became reachable since the
    /// last call.
    fn process_reach_methods(&mut self) {
        while let Some(method) = self.call_graph.reach_next(&mut self.reach_cursor) {
            if !self.processed.insert(method) {
                continue;
            }
            if self.prog.method(method).is_abstract {
                continue;
            }
            debug!("processing reachable method {}", self.prog.method_name(method));
            for &stmt in self.prog.stmts_of(method) {
                self.process_stmt(stmt);
            }
        }
    }

    // New, copy and static field/call statements contribute constraints
    // immediately; everything else waits for receiver objects.
    fn process_stmt(&mut self, id: StmtId) {
        let prog = self.prog;
        match &prog.stmt(id).kind {
            StmtKind::New { lhs, ty } => {
                let obj = self.heap.obj_at(id, ty.clone());
                let node = self.node(Pointer::Var(*lhs));
                let mut set = PointsTo::new();
                set.insert(obj);
                self.worklist.push_back((node, set));
            }
            StmtKind::Copy { lhs, rhs } => {
                self.add_pfg_edge(Pointer::Var(*rhs), Pointer::Var(*lhs));
            }
            StmtKind::LoadField { lhs, access } if access.is_static() => {
                self.add_pfg_edge(Pointer::StaticField(access.field), Pointer::Var(*lhs));
            }
            StmtKind::StoreField { access, rhs } if access.is_static() => {
                self.add_pfg_edge(Pointer::Var(*rhs), Pointer::StaticField(access.field));
            }
            StmtKind::Invoke { exp, .. } if exp.kind == InvokeKind::Static => {
                if let Some(callee) = prog.resolve_callee(None, exp) {
                    self.process_single_call(id, callee);
                }
            }
            _ => {}
        }
    }

    /// Drains the worklist to a fixpoint.
    fn propagate(&mut self) {
        while let Some((node, pts)) = self.worklist.pop_front() {
            let delta = self.pt_data.diff_from(node, &pts);
            if delta.is_empty() {
                continue;
            }
            self.pt_data.union_pts_to(node, &delta);
            for succ in self.pfg.succs_of(node) {
                self.worklist.push_back((succ, delta.clone()));
            }
            if let Pointer::Var(var) = *self.pfg.pointer(node) {
                for obj in delta.iter() {
                    self.process_instance_accesses(var, obj);
                    self.process_call(var, obj);
                }
            }
        }
    }

    // Attaches the instance field/array constraints of `var` to a newly
    // discovered pointee.
    fn process_instance_accesses(&mut self, var: VarId, obj: ObjId) {
        let prog = self.prog;
        for &store in prog.store_fields_of(var) {
            let StmtKind::StoreField { access, rhs } = &prog.stmt(store).kind else {
                unreachable!("non-store statement in store list");
            };
            self.add_pfg_edge(Pointer::Var(*rhs), Pointer::InstanceField(obj, access.field));
        }
        for &load in prog.load_fields_of(var) {
            let StmtKind::LoadField { lhs, access } = &prog.stmt(load).kind else {
                unreachable!("non-load statement in load list");
            };
            self.add_pfg_edge(Pointer::InstanceField(obj, access.field), Pointer::Var(*lhs));
        }
        for &store in prog.store_arrays_of(var) {
            let StmtKind::StoreArray { rhs, .. } = &prog.stmt(store).kind else {
                unreachable!("non-store statement in store list");
            };
            self.add_pfg_edge(Pointer::Var(*rhs), Pointer::ArrayIndex(obj));
        }
        for &load in prog.load_arrays_of(var) {
            let StmtKind::LoadArray { lhs, .. } = &prog.stmt(load).kind else {
                unreachable!("non-load statement in load list");
            };
            self.add_pfg_edge(Pointer::ArrayIndex(obj), Pointer::Var(*lhs));
        }
    }

    /// Resolves the instance calls on `var` against a newly discovered
    /// receiver object.
    fn process_call(&mut self, var: VarId, obj: ObjId) {
        let prog = self.prog;
        for &site in prog.invokes_of(var) {
            let (exp, _) = prog.stmt(site).as_invoke().expect("invoke list corrupted");
            let recv_class = self.heap.obj_class(obj);
            let Some(callee) = prog.resolve_callee(recv_class, exp) else {
                continue;
            };
            if let Some(this) = prog.method(callee).this {
                let this_node = self.node(Pointer::Var(this));
                let mut set = PointsTo::new();
                set.insert(obj);
                self.worklist.push_back((this_node, set));
            }
            self.process_single_call(site, callee);
        }
    }

    /// Adds a call edge and, if new, the argument/return value flows.
    fn process_single_call(&mut self, site: StmtId, callee: MethodId) {
        let prog = self.prog;
        let (exp, result) = prog.stmt(site).as_invoke().expect("not a call site");
        let caller = prog.stmt(site).method;
        if !self
            .call_graph
            .add_edge(call_kind(exp.kind), site, caller, callee)
        {
            return;
        }
        self.process_reach_methods();

        let callee_m = prog.method(callee);
        for (&arg, &param) in exp.args.iter().zip(callee_m.params.iter()) {
            self.add_pfg_edge(Pointer::Var(arg), Pointer::Var(param));
        }
        if let Some(lhs) = result {
            for &ret in &callee_m.ret_vars {
                self.add_pfg_edge(Pointer::Var(ret), Pointer::Var(lhs));
            }
        }
    }

    /// Adds a subset edge; a new edge immediately pushes the source's
    /// current points-to set to the target.
    fn add_pfg_edge(&mut self, src: Pointer, dst: Pointer) {
        if let Some((s, d)) = self.pfg.add_edge(&src, &dst) {
            if let Some(pts) = self.pt_data.get_pts(s) {
                if !pts.is_empty() {
                    self.worklist.push_back((d, pts.clone()));
                }
            }
        }
    }

    #[inline]
    fn node(&mut self, pointer: Pointer) -> PfgNodeId {
        self.pfg.get_or_insert_node(&pointer)
    }

    /// Consumes the solved analysis into its result surface.
    pub fn into_result(self) -> PointerAnalysisResult {
        let mut var_pts: HashMap<VarId, PointsTo<ObjId>> = HashMap::new();
        for node in self.pfg.node_ids() {
            if let Pointer::Var(var) = *self.pfg.pointer(node) {
                if let Some(pts) = self.pt_data.get_pts(node) {
                    var_pts
                        .entry(var)
                        .or_insert_with(PointsTo::new)
                        .union(pts);
                }
            }
        }
        PointerAnalysisResult {
            var_pts,
            cs_var_pts: HashMap::new(),
            call_graph: self.call_graph,
            cs_call_graph: None,
            heap: self.heap,
            taint_flows: BTreeSet::new(),
        }
    }

}

impl<'p> PointerAnalysis for AndersenPointerAnalysis<'p> {
    fn analyze(&mut self) {
        let now = Instant::now();
        self.initialize();
        self.propagate();
        info!(
            "Andersen points-to analysis completed in {}",
            humantime::format_duration(now.elapsed())
        );
        info!(
            "{} reachable methods, {} call edges, {} pointers, {} objects",
            self.call_graph.method_count(),
            self.call_graph.edge_count(),
            self.pfg.node_count(),
            self.heap.obj_count()
        );
    }
}
