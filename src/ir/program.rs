// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The arena-backed program representation.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use super::stmt::{Stmt, StmtKind};
use super::types::Type;
use super::{ClassId, FieldId, MethodId, StmtId, SubsigId, VarId};
use crate::util::bit_vec::Idx;

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<ClassId>,
    pub is_interface: bool,
    pub(crate) declared: HashMap<SubsigId, MethodId>,
    pub(crate) direct_subclasses: Vec<ClassId>,
    pub(crate) direct_subinterfaces: Vec<ClassId>,
    pub(crate) direct_implementors: Vec<ClassId>,
}

#[derive(Debug)]
pub struct Method {
    pub class: ClassId,
    pub subsig: SubsigId,
    pub is_abstract: bool,
    pub ret_ty: Type,
    pub this: Option<VarId>,
    pub params: Vec<VarId>,
    /// Variables returned by the `Return` statements of the body.
    pub ret_vars: Vec<VarId>,
    /// Body statements in index order, including the entry/exit markers.
    pub stmts: Vec<StmtId>,
    pub entry: StmtId,
    pub exit: StmtId,
}

#[derive(Debug)]
pub struct Field {
    pub class: ClassId,
    pub name: String,
    pub ty: Type,
}

#[derive(Debug)]
pub struct Var {
    pub name: String,
    pub ty: Type,
    pub method: MethodId,
    // Relation lists consumed by the points-to solvers and inter-CP:
    // statements accessing the heap through this variable, and call sites
    // dispatching on it.
    pub(crate) store_fields: Vec<StmtId>,
    pub(crate) load_fields: Vec<StmtId>,
    pub(crate) store_arrays: Vec<StmtId>,
    pub(crate) load_arrays: Vec<StmtId>,
    pub(crate) invokes: Vec<StmtId>,
}

/// The whole analyzed program. Built once by the host, then read-only for
/// the lifetime of every analysis.
pub struct Program {
    classes: Vec<Class>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    vars: Vec<Var>,
    stmts: Vec<Stmt>,
    subsig_names: Vec<String>,
    subsig_map: HashMap<String, SubsigId>,
    class_map: HashMap<String, ClassId>,
    entry_point: Option<MethodId>,
}

impl Program {
    pub fn new() -> Self {
        Program {
            classes: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            vars: Vec::new(),
            stmts: Vec::new(),
            subsig_names: Vec::new(),
            subsig_map: HashMap::new(),
            class_map: HashMap::new(),
            entry_point: None,
        }
    }

    // ------------------------------------------------------------------
    // Construction (host side).
    // ------------------------------------------------------------------

    pub fn add_class(
        &mut self,
        name: &str,
        superclass: Option<ClassId>,
        is_interface: bool,
    ) -> ClassId {
        let id = ClassId::new(self.classes.len());
        self.classes.push(Class {
            name: name.to_string(),
            superclass,
            is_interface,
            declared: HashMap::new(),
            direct_subclasses: Vec::new(),
            direct_subinterfaces: Vec::new(),
            direct_implementors: Vec::new(),
        });
        if let Some(sup) = superclass {
            if is_interface {
                self.classes[sup.index()].direct_subinterfaces.push(id);
            } else if self.classes[sup.index()].is_interface {
                self.classes[sup.index()].direct_implementors.push(id);
            } else {
                self.classes[sup.index()].direct_subclasses.push(id);
            }
        }
        self.class_map.insert(name.to_string(), id);
        id
    }

    /// Registers `class` as a direct implementor of `iface` (in addition to
    /// any superclass relation recorded at `add_class`).
    pub fn add_interface(&mut self, class: ClassId, iface: ClassId) {
        debug_assert!(self.classes[iface.index()].is_interface);
        self.classes[iface.index()].direct_implementors.push(class);
    }

    /// Interns a method subsignature.
    pub fn subsig(&mut self, name: &str) -> SubsigId {
        match self.subsig_map.entry(name.to_string()) {
            Entry::Occupied(o) => *o.get(),
            Entry::Vacant(v) => {
                let id = SubsigId::new(self.subsig_names.len());
                self.subsig_names.push(name.to_string());
                *v.insert(id)
            }
        }
    }

    pub fn add_field(&mut self, class: ClassId, name: &str, ty: Type) -> FieldId {
        let id = FieldId::new(self.fields.len());
        self.fields.push(Field {
            class,
            name: name.to_string(),
            ty,
        });
        id
    }

    /// Adds a method and its synthetic entry/exit markers. The method is
    /// registered under its subsignature in the declaring class.
    pub fn add_method(
        &mut self,
        class: ClassId,
        subsig: &str,
        is_abstract: bool,
        ret_ty: Type,
    ) -> MethodId {
        let subsig = self.subsig(subsig);
        let id = MethodId::new(self.methods.len());
        let entry = StmtId::new(self.stmts.len());
        self.stmts.push(Stmt {
            method: id,
            index: 0,
            kind: StmtKind::Nop,
        });
        let exit = StmtId::new(self.stmts.len());
        self.stmts.push(Stmt {
            method: id,
            index: 1,
            kind: StmtKind::Nop,
        });
        self.methods.push(Method {
            class,
            subsig,
            is_abstract,
            ret_ty,
            this: None,
            params: Vec::new(),
            ret_vars: Vec::new(),
            stmts: vec![entry, exit],
            entry,
            exit,
        });
        self.classes[class.index()].declared.insert(subsig, id);
        id
    }

    pub fn new_var(&mut self, method: MethodId, name: &str, ty: Type) -> VarId {
        let id = VarId::new(self.vars.len());
        self.vars.push(Var {
            name: name.to_string(),
            ty,
            method,
            store_fields: Vec::new(),
            load_fields: Vec::new(),
            store_arrays: Vec::new(),
            load_arrays: Vec::new(),
            invokes: Vec::new(),
        });
        id
    }

    pub fn set_this(&mut self, method: MethodId, var: VarId) {
        self.methods[method.index()].this = Some(var);
    }

    pub fn add_param(&mut self, method: MethodId, var: VarId) {
        self.methods[method.index()].params.push(var);
    }

    /// Appends a statement to a method body, maintaining the per-variable
    /// relation lists and the method's return variables.
    pub fn add_stmt(&mut self, method: MethodId, kind: StmtKind) -> StmtId {
        let id = StmtId::new(self.stmts.len());
        let index = self.methods[method.index()].stmts.len();
        match &kind {
            StmtKind::LoadField { access, .. } => {
                if let Some(base) = access.base {
                    self.vars[base.index()].load_fields.push(id);
                }
            }
            StmtKind::StoreField { access, .. } => {
                if let Some(base) = access.base {
                    self.vars[base.index()].store_fields.push(id);
                }
            }
            StmtKind::LoadArray { access, .. } => {
                self.vars[access.base.index()].load_arrays.push(id);
            }
            StmtKind::StoreArray { access, .. } => {
                self.vars[access.base.index()].store_arrays.push(id);
            }
            StmtKind::Invoke { exp, .. } => {
                if let Some(base) = exp.base {
                    self.vars[base.index()].invokes.push(id);
                }
            }
            StmtKind::Return { value: Some(v) } => {
                let ret_vars = &mut self.methods[method.index()].ret_vars;
                if !ret_vars.contains(v) {
                    ret_vars.push(*v);
                }
            }
            _ => {}
        }
        self.stmts.push(Stmt {
            method,
            index,
            kind,
        });
        self.methods[method.index()].stmts.push(id);
        id
    }

    pub fn set_entry_point(&mut self, method: MethodId) {
        self.entry_point = Some(method);
    }

    // ------------------------------------------------------------------
    // Accessors (analysis side).
    // ------------------------------------------------------------------

    pub fn entry_point(&self) -> Option<MethodId> {
        self.entry_point
    }

    #[inline]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.index()]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.index()]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.index()]
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn subsig_name(&self, id: SubsigId) -> &str {
        &self.subsig_names[id.index()]
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_map.get(name).copied()
    }

    /// Looks up a declared method by class name and subsignature, for
    /// resolving configuration entries against the IR.
    pub fn find_method(&self, class_name: &str, subsig: &str) -> Option<MethodId> {
        let class = self.class_by_name(class_name)?;
        let subsig = *self.subsig_map.get(subsig)?;
        self.classes[class.index()].declared.get(&subsig).copied()
    }

    /// Body statements of a method, excluding nothing: entry and exit
    /// markers are plain `Nop`s and harmless to every consumer.
    pub fn stmts_of(&self, method: MethodId) -> &[StmtId] {
        &self.methods[method.index()].stmts
    }

    pub fn can_hold_int(&self, var: VarId) -> bool {
        self.vars[var.index()].ty.can_hold_int()
    }

    /// A readable `Class.subsig` form for logs.
    pub fn method_name(&self, id: MethodId) -> String {
        let m = &self.methods[id.index()];
        format!(
            "{}.{}",
            self.classes[m.class.index()].name,
            self.subsig_names[m.subsig.index()]
        )
    }

    // Relation lists exposed on variables.

    pub fn store_fields_of(&self, var: VarId) -> &[StmtId] {
        &self.vars[var.index()].store_fields
    }

    pub fn load_fields_of(&self, var: VarId) -> &[StmtId] {
        &self.vars[var.index()].load_fields
    }

    pub fn store_arrays_of(&self, var: VarId) -> &[StmtId] {
        &self.vars[var.index()].store_arrays
    }

    pub fn load_arrays_of(&self, var: VarId) -> &[StmtId] {
        &self.vars[var.index()].load_arrays
    }

    pub fn invokes_of(&self, var: VarId) -> &[StmtId] {
        &self.vars[var.index()].invokes
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn var_ids(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.vars.len()).map(VarId::new)
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
