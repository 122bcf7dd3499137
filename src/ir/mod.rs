// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! The prebuilt intermediate representation consumed by the engine.
//!
//! Hosts construct a [`program::Program`] (classes, methods, fields,
//! variables, statements) before any analysis runs; during solving the IR
//! is read-only. All entities are referred to by `u32` index newtypes.

pub mod context;
pub mod hierarchy;
pub mod program;
pub mod stmt;
pub mod types;

crate::index_type! {
    /// A class or interface in the analyzed program.
    pub struct ClassId
}

crate::index_type! {
    /// A method, uniquely identified across the whole program.
    pub struct MethodId
}

crate::index_type! {
    /// A field declaration.
    pub struct FieldId
}

crate::index_type! {
    /// A local variable or parameter; unique across the whole program.
    pub struct VarId
}

crate::index_type! {
    /// A statement; unique across the whole program.
    pub struct StmtId
}

crate::index_type! {
    /// An interned method subsignature (name plus descriptor).
    pub struct SubsigId
}
