// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Inter-procedural constant propagation with alias-aware heap accesses.
//!
//! Field and array loads are resolved through the points-to result: a
//! store through any alias updates a heap cell keyed by the abstract
//! object, and every load that may read the cell is re-enqueued. The heap
//! environment is owned by the analysis and lives for one solve.

use std::collections::HashMap;

use super::InterDataflowAnalysis;
use crate::dataflow::analysis::DataflowAnalysis;
use crate::dataflow::constprop::ConstantPropagation;
use crate::dataflow::fact::{CpFact, CpValue};
use crate::graph::icfg::{Icfg, IcfgEdge, IcfgEdgeKind};
use crate::ir::program::Program;
use crate::ir::stmt::{Exp, StmtKind};
use crate::ir::{ClassId, FieldId, StmtId, VarId};
use crate::pta::heap::ObjId;
use crate::pta::result::PointerAnalysisResult;

/// Heap cells and the maps driving load re-enqueueing; one per solve.
struct HeapEnv {
    instance_vals: HashMap<(ObjId, FieldId), CpValue>,
    static_vals: HashMap<(ClassId, FieldId), CpValue>,
    // Array cells are keyed per object by the stored index value; `Undef`
    // indices are never recorded.
    array_vals: HashMap<ObjId, HashMap<CpValue, CpValue>>,
    alias_map: HashMap<ObjId, Vec<VarId>>,
    static_load_fields: HashMap<(ClassId, FieldId), Vec<StmtId>>,
}

pub struct InterConstantPropagation<'p> {
    prog: &'p Program,
    cp: ConstantPropagation<'p>,
    pta: &'p PointerAnalysisResult,
    heap: HeapEnv,
}

impl<'p> InterConstantPropagation<'p> {
    pub fn new(prog: &'p Program, icfg: &Icfg, pta: &'p PointerAnalysisResult) -> Self {
        let mut alias_map: HashMap<ObjId, Vec<VarId>> = HashMap::new();
        for var in pta.vars() {
            for obj in pta.points_to(var) {
                alias_map.entry(obj).or_default().push(var);
            }
        }
        let mut static_load_fields: HashMap<(ClassId, FieldId), Vec<StmtId>> = HashMap::new();
        for node in icfg.nodes() {
            if let StmtKind::LoadField { access, .. } = &prog.stmt(node).kind {
                if access.is_static() {
                    let key = (prog.field(access.field).class, access.field);
                    static_load_fields.entry(key).or_default().push(node);
                }
            }
        }
        InterConstantPropagation {
            prog,
            cp: ConstantPropagation::new(prog),
            pta,
            heap: HeapEnv {
                instance_vals: HashMap::new(),
                static_vals: HashMap::new(),
                array_vals: HashMap::new(),
                alias_map,
                static_load_fields,
            },
        }
    }

    /// A stored array index and a load index are compatible iff they are
    /// equal constants, or one of them is `NAC` and the other is not
    /// `UNDEF`.
    fn index_compatible(stored: CpValue, load: CpValue) -> bool {
        match (stored, load) {
            (CpValue::Const(a), CpValue::Const(b)) => a == b,
            (CpValue::Nac, other) | (other, CpValue::Nac) => !other.is_undef(),
            _ => false,
        }
    }

    fn load_field_value(&self, lhs: VarId, access_base: Option<VarId>, field: FieldId) -> CpValue {
        debug_assert!(self.prog.can_hold_int(lhs));
        match access_base {
            None => {
                let key = (self.prog.field(field).class, field);
                self.heap
                    .static_vals
                    .get(&key)
                    .copied()
                    .unwrap_or(CpValue::Undef)
            }
            Some(base) => {
                let mut value = CpValue::Undef;
                for obj in self.pta.points_to(base) {
                    if let Some(&stored) = self.heap.instance_vals.get(&(obj, field)) {
                        value = CpValue::meet(value, stored);
                    }
                }
                value
            }
        }
    }

    fn load_array_value(&self, base: VarId, load_index: CpValue) -> CpValue {
        let mut value = CpValue::Undef;
        for obj in self.pta.points_to(base) {
            if let Some(cells) = self.heap.array_vals.get(&obj) {
                for (&stored_index, &stored) in cells {
                    if Self::index_compatible(stored_index, load_index) {
                        value = CpValue::meet(value, stored);
                    }
                }
            }
        }
        value
    }

    /// Loads of `field` through any alias of `obj`.
    fn aliased_field_loads(&self, obj: ObjId, field: FieldId) -> Vec<StmtId> {
        let mut loads = Vec::new();
        if let Some(aliases) = self.heap.alias_map.get(&obj) {
            for &var in aliases {
                for &load in self.prog.load_fields_of(var) {
                    let StmtKind::LoadField { access, .. } = &self.prog.stmt(load).kind else {
                        unreachable!("non-load statement in load list");
                    };
                    if access.field == field {
                        loads.push(load);
                    }
                }
            }
        }
        loads
    }

    /// Array loads through any alias of `obj`.
    fn aliased_array_loads(&self, obj: ObjId) -> Vec<StmtId> {
        let mut loads = Vec::new();
        if let Some(aliases) = self.heap.alias_map.get(&obj) {
            for &var in aliases {
                loads.extend_from_slice(self.prog.load_arrays_of(var));
            }
        }
        loads
    }
}

impl<'p> InterDataflowAnalysis for InterConstantPropagation<'p> {
    type Fact = CpFact;

    fn is_forward(&self) -> bool {
        true
    }

    fn new_boundary_fact(&self, entry: StmtId) -> CpFact {
        let method = self.prog.stmt(entry).method;
        let mut fact = CpFact::new();
        for &param in &self.prog.method(method).params {
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

    fn transfer_call_node(&self, _stmt: StmtId, in_fact: &CpFact, out_fact: &mut CpFact) -> bool {
        // Identity: the call-site LHS is handled on the return edge, the
        // kill on the call-to-return edge.
        ConstantPropagation::transfer_def(in_fact, out_fact, None)
    }

    fn transfer_non_call_node(
        &self,
        stmt: StmtId,
        in_fact: &CpFact,
        out_fact: &mut CpFact,
    ) -> bool {
        let s = self.prog.stmt(stmt);
        let def = match &s.kind {
            StmtKind::LoadField { lhs, access } if self.prog.can_hold_int(*lhs) => {
                Some((*lhs, self.load_field_value(*lhs, access.base, access.field)))
            }
            StmtKind::LoadArray { lhs, access } if self.prog.can_hold_int(*lhs) => {
                let index = in_fact.get(access.index);
                Some((*lhs, self.load_array_value(access.base, index)))
            }
            _ => return self.cp.transfer_node(stmt, in_fact, out_fact),
        };
        ConstantPropagation::transfer_def(in_fact, out_fact, def)
    }

    fn transfer_edge(&self, edge: &IcfgEdge, out_fact: &CpFact) -> CpFact {
        match &edge.kind {
            IcfgEdgeKind::Normal => out_fact.clone(),
            IcfgEdgeKind::CallToReturn => {
                let mut fact = out_fact.clone();
                if let Some((_, result)) = self.prog.stmt(edge.source).as_invoke() {
                    if let Some(lhs) = result {
                        fact.remove(lhs);
                    }
                }
                fact
            }
            IcfgEdgeKind::Call { callee } => {
                let mut fact = CpFact::new();
                let (exp, _) = self
                    .prog
                    .stmt(edge.source)
                    .as_invoke()
                    .expect("call edge from a non-call node");
                for (&arg, &param) in exp.args.iter().zip(self.prog.method(*callee).params.iter())
                {
                    fact.update(param, out_fact.get(arg));
                }
                fact
            }
            IcfgEdgeKind::Return {
                call_site,
                ret_vars,
            } => {
                let mut fact = CpFact::new();
                let (_, result) = self
                    .prog
                    .stmt(*call_site)
                    .as_invoke()
                    .expect("return edge to a non-call site");
                if let Some(lhs) = result {
                    for &ret in ret_vars {
                        let value = CpValue::meet(fact.get(lhs), out_fact.get(ret));
                        fact.update(lhs, value);
                    }
                }
                fact
            }
        }
    }

    fn process_heap_store(&mut self, stmt: StmtId, in_fact: &CpFact) -> Vec<StmtId> {
        let mut reloads = Vec::new();
        match &self.prog.stmt(stmt).kind {
            StmtKind::StoreField { access, rhs } if self.prog.can_hold_int(*rhs) => {
                let new_val = ConstantPropagation::evaluate(&Exp::Var(*rhs), in_fact);
                match access.base {
                    None => {
                        let key = (self.prog.field(access.field).class, access.field);
                        let old = self
                            .heap
                            .static_vals
                            .get(&key)
                            .copied()
                            .unwrap_or(CpValue::Undef);
                        let merged = CpValue::meet(old, new_val);
                        if merged != old {
                            self.heap.static_vals.insert(key, merged);
                            if let Some(loads) = self.heap.static_load_fields.get(&key) {
                                reloads.extend_from_slice(loads);
                            }
                        }
                    }
                    Some(base) => {
                        let objs: Vec<ObjId> = self.pta.points_to(base).collect();
                        for obj in objs {
                            let key = (obj, access.field);
                            let old = self
                                .heap
                                .instance_vals
                                .get(&key)
                                .copied()
                                .unwrap_or(CpValue::Undef);
                            let merged = CpValue::meet(old, new_val);
                            if merged != old {
                                self.heap.instance_vals.insert(key, merged);
                                reloads.extend(self.aliased_field_loads(obj, access.field));
                            }
                        }
                    }
                }
            }
            StmtKind::StoreArray { access, rhs } if self.prog.can_hold_int(*rhs) => {
                let index = in_fact.get(access.index);
                if index.is_undef() {
                    return reloads;
                }
                let new_val = ConstantPropagation::evaluate(&Exp::Var(*rhs), in_fact);
                let objs: Vec<ObjId> = self.pta.points_to(access.base).collect();
                for obj in objs {
                    let cells = self.heap.array_vals.entry(obj).or_default();
                    let old = cells.get(&index).copied().unwrap_or(CpValue::Undef);
                    let merged = CpValue::meet(old, new_val);
                    if merged != old {
                        cells.insert(index, merged);
                        reloads.extend(self.aliased_array_loads(obj));
                    }
                }
            }
            _ => {}
        }
        reloads
    }
}
