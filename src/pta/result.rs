// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The result surface of a pointer analysis, read-only after `analyze`.

use std::collections::{BTreeSet, HashMap};

use super::heap::{CsObjId, HeapManager, ObjId};
use super::taint::TaintFlow;
use super::{CsCallSite, CsMethod, PointsTo};
use crate::graph::call_graph::CallGraph;
use crate::ir::context::ContextId;
use crate::ir::{MethodId, StmtId, VarId};
use crate::pts_set::points_to::PointsToSet;

pub struct PointerAnalysisResult {
    pub(crate) var_pts: HashMap<VarId, PointsTo<ObjId>>,
    pub(crate) cs_var_pts: HashMap<(ContextId, VarId), PointsTo<CsObjId>>,
    pub(crate) call_graph: CallGraph<MethodId, StmtId>,
    pub(crate) cs_call_graph: Option<CallGraph<CsMethod, CsCallSite>>,
    pub(crate) heap: HeapManager,
    pub(crate) taint_flows: BTreeSet<TaintFlow>,
}

impl PointerAnalysisResult {
    /// Variables with a non-empty points-to set.
    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.var_pts.keys().copied()
    }

    /// The context-erased points-to set of a variable.
    pub fn points_to(&self, var: VarId) -> impl Iterator<Item = ObjId> + '_ {
        self.var_pts.get(&var).into_iter().flat_map(|pts| pts.iter())
    }

    pub fn pts_of(&self, var: VarId) -> Option<&PointsTo<ObjId>> {
        self.var_pts.get(&var)
    }

    /// Context-qualified variables with a non-empty points-to set. Empty
    /// for a context-insensitive analysis.
    pub fn cs_vars(&self) -> impl Iterator<Item = (ContextId, VarId)> + '_ {
        self.cs_var_pts.keys().copied()
    }

    pub fn cs_points_to(
        &self,
        ctx: ContextId,
        var: VarId,
    ) -> impl Iterator<Item = CsObjId> + '_ {
        self.cs_var_pts
            .get(&(ctx, var))
            .into_iter()
            .flat_map(|pts| pts.iter())
    }

    /// The context-erased call graph discovered during solving.
    pub fn call_graph(&self) -> &CallGraph<MethodId, StmtId> {
        &self.call_graph
    }

    /// The context-sensitive call graph, if the analysis was
    /// context-sensitive.
    pub fn cs_call_graph(&self) -> Option<&CallGraph<CsMethod, CsCallSite>> {
        self.cs_call_graph.as_ref()
    }

    pub fn heap(&self) -> &HeapManager {
        &self.heap
    }

    /// Taint flows collected after solving, in a stable order.
    pub fn taint_flows(&self) -> &BTreeSet<TaintFlow> {
        &self.taint_flows
    }
}
