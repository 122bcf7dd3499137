// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context-sensitive Andersen-style points-to analysis.
//!
//! Structurally the context-insensitive solver with every pointer, object,
//! method and call site qualified by a context chosen by the
//! [`ContextSelector`]. Qualified entities are interned, so identity
//! comparison is structural equality throughout. The taint overlay hooks
//! into call-edge processing and the outer fixpoint loop.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Instant;

use log::*;

use super::context_strategy::ContextSelector;
use super::heap::{CsObjId, HeapManager, ObjId};
use super::result::PointerAnalysisResult;
use super::taint::{endpoint_var, TaintAnalysis, TaintConfig, TaintFlow};
use super::{call_kind, CsCallSite, CsMethod, PointerAnalysis, PointsTo};
use crate::graph::call_graph::CallGraph;
use crate::graph::pfg::{PfgNodeId, PointerFlowGraph};
use crate::ir::context::ContextId;
use crate::ir::program::Program;
use crate::ir::stmt::{InvokeKind, StmtKind};
use crate::ir::{FieldId, MethodId, StmtId, VarId};
use crate::pts_set::points_to::PointsToSet;
use crate::pts_set::pt_data::PointsToData;
use crate::util::mono_queue::Cursor;

/// A node of the context-sensitive pointer flow graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CsPointer {
    Var(ContextId, VarId),
    StaticField(FieldId),
    InstanceField(CsObjId, FieldId),
    ArrayIndex(CsObjId),
}

pub struct ContextSensitivePointerAnalysis<'p, S: ContextSelector> {
    prog: &'p Program,
    selector: S,
    heap: HeapManager,
    pfg: PointerFlowGraph<CsPointer>,
    pt_data: PointsToData<PfgNodeId, CsObjId, PointsTo<CsObjId>>,
    pub call_graph: CallGraph<CsMethod, CsCallSite>,
    worklist: VecDeque<(PfgNodeId, PointsTo<CsObjId>)>,
    reach_cursor: Cursor,
    processed: HashSet<CsMethod>,
    taint: Option<TaintAnalysis>,
    // Call edges whose callee carries transfer rules; re-scanned in the
    // outer loop until no transfer enqueues anything new.
    transfer_sites: Vec<(CsCallSite, MethodId)>,
}

impl<'p, S: ContextSelector> ContextSensitivePointerAnalysis<'p, S> {
    pub fn new(prog: &'p Program, selector: S) -> Self {
        let call_graph = CallGraph::new();
        let reach_cursor = call_graph.reach_cursor();
        ContextSensitivePointerAnalysis {
            prog,
            selector,
            heap: HeapManager::new(),
            pfg: PointerFlowGraph::new(),
            pt_data: PointsToData::new(),
            call_graph,
            worklist: VecDeque::new(),
            reach_cursor,
            processed: HashSet::new(),
            taint: None,
            transfer_sites: Vec::new(),
        }
    }

    /// Enables the taint overlay for this run.
    pub fn with_taint(mut self, config: TaintConfig) -> Self {
        self.taint = Some(TaintAnalysis::new(config));
        self
    }

    fn initialize(&mut self) {
        let entry = self
            .prog
            .entry_point()
            .expect("points-to analysis requires an entry point");
        let empty = self.selector.empty_context();
        self.call_graph.add_node(CsMethod::new(empty, entry));
        self.process_reach_methods();
    }

    fn process_reach_methods(&mut self) {
        while let Some(cs_method) = self.call_graph.reach_next(&mut self.reach_cursor) {
            if !self.processed.insert(cs_method) {
                continue;
            }
            if self.prog.method(cs_method.method).is_abstract {
                continue;
            }
            debug!(
                "processing reachable method {} in context {:?}",
                self.prog.method_name(cs_method.method),
                cs_method.ctx
            );
            for &stmt in self.prog.stmts_of(cs_method.method) {
                self.process_stmt(cs_method.ctx, stmt);
            }
        }
    }

    fn process_stmt(&mut self, ctx: ContextId, id: StmtId) {
        let prog = self.prog;
        match &prog.stmt(id).kind {
            StmtKind::New { lhs, ty } => {
                let obj = self.heap.obj_at(id, ty.clone());
                let hctx = self.selector.select_heap_context(ctx, obj);
                let cs_obj = self.heap.cs_obj(hctx, obj);
                let node = self.node(CsPointer::Var(ctx, *lhs));
                let mut set = PointsTo::new();
                set.insert(cs_obj);
                self.worklist.push_back((node, set));
            }
            StmtKind::Copy { lhs, rhs } => {
                self.add_pfg_edge(CsPointer::Var(ctx, *rhs), CsPointer::Var(ctx, *lhs));
            }
            StmtKind::LoadField { lhs, access } if access.is_static() => {
                self.add_pfg_edge(
                    CsPointer::StaticField(access.field),
                    CsPointer::Var(ctx, *lhs),
                );
            }
            StmtKind::StoreField { access, rhs } if access.is_static() => {
                self.add_pfg_edge(
                    CsPointer::Var(ctx, *rhs),
                    CsPointer::StaticField(access.field),
                );
            }
            StmtKind::Invoke { exp, .. } if exp.kind == InvokeKind::Static => {
                if let Some(callee) = prog.resolve_callee(None, exp) {
                    let cs_site = CsCallSite::new(ctx, id);
                    let callee_ctx = self.selector.select_context(ctx, id, callee);
                    self.process_single_call(cs_site, CsMethod::new(callee_ctx, callee));
                }
            }
            _ => {}
        }
    }

    /// The outer fixpoint: drain the worklist, then re-apply taint
    /// transfers; taint objects are finite, so this terminates.
    fn propagate(&mut self) {
        loop {
            self.drain_worklist();
            if !self.apply_taint_transfers() {
                break;
            }
        }
    }

    fn drain_worklist(&mut self) {
        while let Some((node, pts)) = self.worklist.pop_front() {
            let delta = self.pt_data.diff_from(node, &pts);
            if delta.is_empty() {
                continue;
            }
            self.pt_data.union_pts_to(node, &delta);
            for succ in self.pfg.succs_of(node) {
                self.worklist.push_back((succ, delta.clone()));
            }
            if let CsPointer::Var(ctx, var) = *self.pfg.pointer(node) {
                for cs_obj in delta.iter() {
                    self.process_instance_accesses(ctx, var, cs_obj);
                    self.process_call(ctx, var, cs_obj);
                }
            }
        }
    }

    fn process_instance_accesses(&mut self, ctx: ContextId, var: VarId, cs_obj: CsObjId) {
        let prog = self.prog;
        for &store in prog.store_fields_of(var) {
            let StmtKind::StoreField { access, rhs } = &prog.stmt(store).kind else {
                unreachable!("non-store statement in store list");
            };
            self.add_pfg_edge(
                CsPointer::Var(ctx, *rhs),
                CsPointer::InstanceField(cs_obj, access.field),
            );
        }
        for &load in prog.load_fields_of(var) {
            let StmtKind::LoadField { lhs, access } = &prog.stmt(load).kind else {
                unreachable!("non-load statement in load list");
            };
            self.add_pfg_edge(
                CsPointer::InstanceField(cs_obj, access.field),
                CsPointer::Var(ctx, *lhs),
            );
        }
        for &store in prog.store_arrays_of(var) {
            let StmtKind::StoreArray { rhs, .. } = &prog.stmt(store).kind else {
                unreachable!("non-store statement in store list");
            };
            self.add_pfg_edge(CsPointer::Var(ctx, *rhs), CsPointer::ArrayIndex(cs_obj));
        }
        for &load in prog.load_arrays_of(var) {
            let StmtKind::LoadArray { lhs, .. } = &prog.stmt(load).kind else {
                unreachable!("non-load statement in load list");
            };
            self.add_pfg_edge(CsPointer::ArrayIndex(cs_obj), CsPointer::Var(ctx, *lhs));
        }
    }

    fn process_call(&mut self, ctx: ContextId, var: VarId, recv: CsObjId) {
        let prog = self.prog;
        let (recv_ctx, recv_obj) = self.heap.cs_obj_parts(recv);
        let recv_class = self.heap.obj_class(recv_obj);
        for &site in prog.invokes_of(var) {
            let (exp, _) = prog.stmt(site).as_invoke().expect("invoke list corrupted");
            let Some(callee) = prog.resolve_callee(recv_class, exp) else {
                continue;
            };
            let cs_site = CsCallSite::new(ctx, site);
            let callee_ctx =
                self.selector
                    .select_context_with_recv(ctx, site, recv_ctx, recv_obj, callee);
            if let Some(this) = prog.method(callee).this {
                let this_node = self.node(CsPointer::Var(callee_ctx, this));
                let mut set = PointsTo::new();
                set.insert(recv);
                self.worklist.push_back((this_node, set));
            }
            self.process_single_call(cs_site, CsMethod::new(callee_ctx, callee));
        }
    }

    fn process_single_call(&mut self, cs_site: CsCallSite, cs_callee: CsMethod) {
        let prog = self.prog;
        let (exp, result) = prog
            .stmt(cs_site.site)
            .as_invoke()
            .expect("not a call site");
        let caller = CsMethod::new(cs_site.ctx, prog.stmt(cs_site.site).method);
        if !self
            .call_graph
            .add_edge(call_kind(exp.kind), cs_site, caller, cs_callee)
        {
            return;
        }
        self.process_reach_methods();

        let callee_m = prog.method(cs_callee.method);
        for (&arg, &param) in exp.args.iter().zip(callee_m.params.iter()) {
            self.add_pfg_edge(
                CsPointer::Var(cs_site.ctx, arg),
                CsPointer::Var(cs_callee.ctx, param),
            );
        }
        if let Some(lhs) = result {
            for &ret in &callee_m.ret_vars {
                self.add_pfg_edge(
                    CsPointer::Var(cs_callee.ctx, ret),
                    CsPointer::Var(cs_site.ctx, lhs),
                );
            }
        }

        self.apply_taint_source(cs_site, cs_callee.method, result);
        let is_transfer = self
            .taint
            .as_ref()
            .map_or(false, |t| t.has_transfer(cs_callee.method));
        if is_transfer {
            self.transfer_sites.push((cs_site, cs_callee.method));
        }
    }

    /// Materializes a taint object into the call-site LHS if the callee is
    /// a configured source.
    fn apply_taint_source(&mut self, cs_site: CsCallSite, callee: MethodId, result: Option<VarId>) {
        let Some(lhs) = result else {
            return;
        };
        let ty = match &self.taint {
            Some(t) => t.source_type(callee, &self.prog.method(callee).ret_ty),
            None => None,
        };
        let Some(ty) = ty else {
            return;
        };
        let obj = self.heap.taint_obj(cs_site.site, ty);
        let empty = self.selector.empty_context();
        let cs_obj = self.heap.cs_obj(empty, obj);
        let node = self.node(CsPointer::Var(cs_site.ctx, lhs));
        let mut set = PointsTo::new();
        set.insert(cs_obj);
        self.worklist.push_back((node, set));
    }

    /// Re-applies every recorded transfer rule; returns true if any taint
    /// object was enqueued that the target does not hold yet.
    fn apply_taint_transfers(&mut self) -> bool {
        if self.taint.is_none() {
            return false;
        }
        let mut changed = false;
        for i in 0..self.transfer_sites.len() {
            let (cs_site, callee) = self.transfer_sites[i];
            let (exp, result) = self
                .prog
                .stmt(cs_site.site)
                .as_invoke()
                .expect("not a call site");
            let rules = self.taint.as_ref().unwrap().transfers_for(callee);
            for rule in rules {
                let from = endpoint_var(rule.from, exp, result);
                let to = endpoint_var(rule.to, exp, result);
                let (Some(from), Some(to)) = (from, to) else {
                    continue;
                };
                let Some(from_node) = self.pfg.get_node_id(&CsPointer::Var(cs_site.ctx, from))
                else {
                    continue;
                };
                let mut source_sites: Vec<StmtId> = Vec::new();
                if let Some(pts) = self.pt_data.get_pts(from_node) {
                    for cs_obj in pts.iter() {
                        let (_, obj) = self.heap.cs_obj_parts(cs_obj);
                        if let Some(source) = self.heap.source_call(obj) {
                            source_sites.push(source);
                        }
                    }
                }
                for source in source_sites {
                    let forged = self.heap.taint_obj(source, rule.ty.clone());
                    let empty = self.selector.empty_context();
                    let cs_obj = self.heap.cs_obj(empty, forged);
                    let to_node = self.node(CsPointer::Var(cs_site.ctx, to));
                    let already = self
                        .pt_data
                        .get_pts(to_node)
                        .map_or(false, |pts| pts.contains(cs_obj));
                    if !already {
                        let mut set = PointsTo::new();
                        set.insert(cs_obj);
                        self.worklist.push_back((to_node, set));
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Scans reachable call edges for sink rules once solving is done.
    fn collect_taint_flows(&self) -> BTreeSet<TaintFlow> {
        let mut flows = BTreeSet::new();
        let Some(taint) = &self.taint else {
            return flows;
        };
        for (_, cs_site, _, cs_callee) in self.call_graph.edges() {
            let (exp, _) = self
                .prog
                .stmt(cs_site.site)
                .as_invoke()
                .expect("not a call site");
            for index in taint.sink_indices(cs_callee.method) {
                let Some(&arg) = exp.args.get(index) else {
                    continue;
                };
                let Some(node) = self.pfg.get_node_id(&CsPointer::Var(cs_site.ctx, arg)) else {
                    continue;
                };
                let Some(pts) = self.pt_data.get_pts(node) else {
                    continue;
                };
                for cs_obj in pts.iter() {
                    let (_, obj) = self.heap.cs_obj_parts(cs_obj);
                    if let Some(source) = self.heap.source_call(obj) {
                        flows.insert(TaintFlow {
                            source,
                            sink: cs_site.site,
                            index,
                        });
                    }
                }
            }
        }
        flows
    }

    fn add_pfg_edge(&mut self, src: CsPointer, dst: CsPointer) {
        if let Some((s, d)) = self.pfg.add_edge(&src, &dst) {
            if let Some(pts) = self.pt_data.get_pts(s) {
                if !pts.is_empty() {
                    self.worklist.push_back((d, pts.clone()));
                }
            }
        }
    }

    #[inline]
    fn node(&mut self, pointer: CsPointer) -> PfgNodeId {
        self.pfg.get_or_insert_node(&pointer)
    }

    /// Consumes the solved analysis into its result surface, including the
    /// context-erased views and the collected taint flows.
    pub fn into_result(self) -> PointerAnalysisResult {
        let taint_flows = self.collect_taint_flows();
        let mut var_pts: HashMap<VarId, PointsTo<ObjId>> = HashMap::new();
        let mut cs_var_pts: HashMap<(ContextId, VarId), PointsTo<CsObjId>> = HashMap::new();
        for node in self.pfg.node_ids() {
            if let CsPointer::Var(ctx, var) = *self.pfg.pointer(node) {
                let Some(pts) = self.pt_data.get_pts(node) else {
                    continue;
                };
                cs_var_pts
                    .entry((ctx, var))
                    .or_insert_with(PointsTo::new)
                    .union(pts);
                let erased = var_pts.entry(var).or_insert_with(PointsTo::new);
                for cs_obj in pts.iter() {
                    erased.insert(self.heap.cs_obj_parts(cs_obj).1);
                }
            }
        }

        let mut ci_graph = CallGraph::new();
        for cs_method in self.call_graph.reachable_methods() {
            ci_graph.add_node(cs_method.method);
        }
        for (kind, cs_site, caller, callee) in self.call_graph.edges() {
            ci_graph.add_edge(kind, cs_site.site, caller.method, callee.method);
        }

        PointerAnalysisResult {
            var_pts,
            cs_var_pts,
            call_graph: ci_graph,
            cs_call_graph: Some(self.call_graph),
            heap: self.heap,
            taint_flows,
        }
    }
}

impl<'p, S: ContextSelector> PointerAnalysis for ContextSensitivePointerAnalysis<'p, S> {
    fn analyze(&mut self) {
        let now = Instant::now();
        self.initialize();
        self.propagate();
        info!(
            "context-sensitive points-to analysis completed in {}",
            humantime::format_duration(now.elapsed())
        );
        info!(
            "{} reachable (context, method) pairs, {} call edges, {} pointers, {} objects",
            self.call_graph.method_count(),
            self.call_graph.edge_count(),
            self.pfg.node_count(),
            self.heap.obj_count()
        );
    }
}
