// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Class-hierarchy queries and method dispatch.

use super::program::Program;
use super::stmt::{InvokeExp, InvokeKind};
use super::{ClassId, MethodId, SubsigId};
use crate::util::bit_vec::Idx;

impl Program {
    pub fn direct_subclasses_of(&self, class: ClassId) -> &[ClassId] {
        &self.class(class).direct_subclasses
    }

    pub fn direct_subinterfaces_of(&self, class: ClassId) -> &[ClassId] {
        &self.class(class).direct_subinterfaces
    }

    pub fn direct_implementors_of(&self, class: ClassId) -> &[ClassId] {
        &self.class(class).direct_implementors
    }

    pub fn declared_method(&self, class: ClassId, subsig: SubsigId) -> Option<MethodId> {
        self.class(class).declared.get(&subsig).copied()
    }

    /// Looks up the dispatch target for `subsig` starting at `class` and
    /// walking up the superclass chain until a non-abstract declaration is
    /// found. Returns `None` when the chain ends without one.
    pub fn dispatch(&self, class: ClassId, subsig: SubsigId) -> Option<MethodId> {
        let mut cursor = Some(class);
        while let Some(c) = cursor {
            if let Some(&m) = self.class(c).declared.get(&subsig) {
                if !self.method(m).is_abstract {
                    return Some(m);
                }
            }
            cursor = self.class(c).superclass;
        }
        None
    }

    /// Resolves the callee of a call site given the receiver object's
    /// dynamic class. For static call sites the receiver is ignored.
    /// Unresolvable targets yield `None` and contribute nothing to the
    /// call graph.
    pub fn resolve_callee(&self, recv_class: Option<ClassId>, invoke: &InvokeExp) -> Option<MethodId> {
        let mref = invoke.method_ref;
        match invoke.kind {
            InvokeKind::Static => self.declared_method(mref.class, mref.subsig),
            InvokeKind::Special => self.dispatch(mref.class, mref.subsig),
            InvokeKind::Virtual | InvokeKind::Interface => {
                self.dispatch(recv_class?, mref.subsig)
            }
        }
    }

    /// All classes, in id order. Used by hosts building CFGs and by tests.
    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.class_count()).map(ClassId::new)
    }
}
