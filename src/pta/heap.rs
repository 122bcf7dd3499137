// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The heap model: abstract objects named by their allocation site, taint
//! objects named by their source call site, and the interning of
//! context-qualified objects.

use std::collections::HashMap;

use crate::ir::context::{ContextElement, ContextId};
use crate::ir::types::Type;
use crate::ir::{ClassId, StmtId};
use crate::util::bit_vec::Idx;

crate::index_type! {
    /// An abstract heap object.
    pub struct ObjId
}

crate::index_type! {
    /// A context-qualified heap object.
    pub struct CsObjId
}

// Heap objects are the elements of object sensitivity.
impl ContextElement for ObjId {}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjKind {
    /// An ordinary object named by its allocation site.
    Alloc { site: StmtId },
    /// A taint object carrying the call site it originated from.
    Taint { source: StmtId },
}

#[derive(Clone, Debug)]
pub struct Obj {
    pub kind: ObjKind,
    pub ty: Type,
}

/// Interns abstract objects and their context-qualified forms, so that
/// equal `(site)`, `(source, type)` and `(context, obj)` keys always yield
/// the same identity.
pub struct HeapManager {
    objs: Vec<Obj>,
    alloc_map: HashMap<StmtId, ObjId>,
    taint_map: HashMap<(StmtId, Type), ObjId>,
    cs_objs: Vec<(ContextId, ObjId)>,
    cs_obj_map: HashMap<(ContextId, ObjId), CsObjId>,
}

impl HeapManager {
    pub fn new() -> Self {
        HeapManager {
            objs: Vec::new(),
            alloc_map: HashMap::new(),
            taint_map: HashMap::new(),
            cs_objs: Vec::new(),
            cs_obj_map: HashMap::new(),
        }
    }

    /// The canonical object of an allocation site.
    pub fn obj_at(&mut self, site: StmtId, ty: Type) -> ObjId {
        if let Some(&obj) = self.alloc_map.get(&site) {
            return obj;
        }
        let obj = ObjId::new(self.objs.len());
        self.objs.push(Obj {
            kind: ObjKind::Alloc { site },
            ty,
        });
        self.alloc_map.insert(site, obj);
        obj
    }

    /// The canonical taint object for a source call site and type.
    pub fn taint_obj(&mut self, source: StmtId, ty: Type) -> ObjId {
        if let Some(&obj) = self.taint_map.get(&(source, ty.clone())) {
            return obj;
        }
        let obj = ObjId::new(self.objs.len());
        self.objs.push(Obj {
            kind: ObjKind::Taint { source },
            ty: ty.clone(),
        });
        self.taint_map.insert((source, ty), obj);
        obj
    }

    #[inline]
    pub fn obj(&self, id: ObjId) -> &Obj {
        &self.objs[id.index()]
    }

    pub fn is_taint(&self, id: ObjId) -> bool {
        matches!(self.obj(id).kind, ObjKind::Taint { .. })
    }

    /// The originating call site of a taint object.
    pub fn source_call(&self, id: ObjId) -> Option<StmtId> {
        match self.obj(id).kind {
            ObjKind::Taint { source } => Some(source),
            _ => None,
        }
    }

    /// The dynamic class of an object, for virtual dispatch.
    pub fn obj_class(&self, id: ObjId) -> Option<ClassId> {
        self.obj(id).ty.as_class()
    }

    /// Interns a context-qualified object.
    pub fn cs_obj(&mut self, ctx: ContextId, obj: ObjId) -> CsObjId {
        if let Some(&cs) = self.cs_obj_map.get(&(ctx, obj)) {
            return cs;
        }
        let cs = CsObjId::new(self.cs_objs.len());
        self.cs_objs.push((ctx, obj));
        self.cs_obj_map.insert((ctx, obj), cs);
        cs
    }

    /// The `(heap context, object)` pair behind a context-qualified object.
    pub fn cs_obj_parts(&self, cs: CsObjId) -> (ContextId, ObjId) {
        self.cs_objs[cs.index()]
    }

    pub fn obj_count(&self) -> usize {
        self.objs.len()
    }
}

impl Default for HeapManager {
    fn default() -> Self {
        Self::new()
    }
}
