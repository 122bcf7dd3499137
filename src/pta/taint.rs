// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Taint rules and the taint overlay consulted by the context-sensitive
//! points-to solver.
//!
//! Sources materialize taint objects at matching call sites, transfers
//! forge retyped taint objects between call-site pointers, and sinks are
//! scanned after solving. Taint objects live in the ordinary object domain
//! (see [`crate::pta::heap`]) and flow through the pointer flow graph like
//! any allocation.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::*;
use serde::Deserialize;
use thiserror::Error;

use crate::ir::program::Program;
use crate::ir::stmt::InvokeExp;
use crate::ir::types::{PrimitiveType, Type};
use crate::ir::{MethodId, StmtId, VarId};

/// An endpoint of a taint transfer at a call site.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransferPoint {
    /// The receiver variable.
    Base,
    /// The call-site LHS.
    Result,
    /// The i-th argument.
    Arg(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceRule {
    pub method: MethodId,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkRule {
    pub method: MethodId,
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRule {
    pub method: MethodId,
    pub from: TransferPoint,
    pub to: TransferPoint,
    pub ty: Type,
}

/// The three ordered rule lists of a taint configuration.
#[derive(Clone, Debug, Default)]
pub struct TaintConfig {
    pub sources: Vec<SourceRule>,
    pub sinks: Vec<SinkRule>,
    pub transfers: Vec<TransferRule>,
}

#[derive(Debug, Error)]
pub enum TaintConfigError {
    #[error("cannot read taint configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed taint configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    sinks: Vec<RawSink>,
    #[serde(default)]
    transfers: Vec<RawTransfer>,
}

#[derive(Deserialize)]
struct RawSource {
    class: String,
    method: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Deserialize)]
struct RawSink {
    class: String,
    method: String,
    index: usize,
}

#[derive(Deserialize)]
struct RawTransfer {
    class: String,
    method: String,
    from: RawPoint,
    to: RawPoint,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Index(usize),
    Name(String),
}

impl TaintConfig {
    pub fn new(
        sources: Vec<SourceRule>,
        sinks: Vec<SinkRule>,
        transfers: Vec<TransferRule>,
    ) -> Self {
        TaintConfig {
            sources,
            sinks,
            transfers,
        }
    }

    /// Loads a JSON rule file, resolving class/method names against the
    /// program. Rules naming unknown methods or types are skipped with a
    /// warning; the remaining rules are kept.
    pub fn load_json(path: &Path, prog: &Program) -> Result<TaintConfig, TaintConfigError> {
        let text = fs::read_to_string(path)?;
        let raw: RawConfig = serde_json::from_str(&text)?;
        let mut config = TaintConfig::default();

        for s in raw.sources {
            match (resolve_method(prog, &s.class, &s.method), resolve_type(prog, &s.ty)) {
                (Some(method), Some(ty)) => config.sources.push(SourceRule { method, ty }),
                _ => warn!("skipping source rule {}.{}: unknown method or type", s.class, s.method),
            }
        }
        for s in raw.sinks {
            match resolve_method(prog, &s.class, &s.method) {
                Some(method) => config.sinks.push(SinkRule {
                    method,
                    index: s.index,
                }),
                None => warn!("skipping sink rule {}.{}: unknown method", s.class, s.method),
            }
        }
        for t in raw.transfers {
            let resolved = (
                resolve_method(prog, &t.class, &t.method),
                resolve_point(&t.from),
                resolve_point(&t.to),
                resolve_type(prog, &t.ty),
            );
            match resolved {
                (Some(method), Some(from), Some(to), Some(ty)) => {
                    config.transfers.push(TransferRule {
                        method,
                        from,
                        to,
                        ty,
                    })
                }
                _ => warn!(
                    "skipping transfer rule {}.{}: unknown method, endpoint or type",
                    t.class, t.method
                ),
            }
        }
        Ok(config)
    }
}

fn resolve_method(prog: &Program, class: &str, subsig: &str) -> Option<MethodId> {
    prog.find_method(class, subsig)
}

fn resolve_type(prog: &Program, name: &str) -> Option<Type> {
    match name {
        "byte" => Some(Type::Primitive(PrimitiveType::Byte)),
        "short" => Some(Type::Primitive(PrimitiveType::Short)),
        "int" => Some(Type::Primitive(PrimitiveType::Int)),
        "char" => Some(Type::Primitive(PrimitiveType::Char)),
        "boolean" => Some(Type::Primitive(PrimitiveType::Boolean)),
        "long" => Some(Type::Primitive(PrimitiveType::Long)),
        "float" => Some(Type::Primitive(PrimitiveType::Float)),
        "double" => Some(Type::Primitive(PrimitiveType::Double)),
        _ => prog.class_by_name(name).map(Type::Reference),
    }
}

fn resolve_point(raw: &RawPoint) -> Option<TransferPoint> {
    match raw {
        RawPoint::Index(i) => Some(TransferPoint::Arg(*i)),
        RawPoint::Name(n) => match n.as_str() {
            "base" => Some(TransferPoint::Base),
            "result" => Some(TransferPoint::Result),
            _ => None,
        },
    }
}

/// The rule tables the solver consults, indexed by callee.
pub struct TaintAnalysis {
    sources: HashMap<MethodId, Vec<Type>>,
    sinks: HashMap<MethodId, Vec<usize>>,
    transfers: HashMap<MethodId, Vec<TransferRule>>,
}

impl TaintAnalysis {
    pub fn new(config: TaintConfig) -> Self {
        let mut sources: HashMap<MethodId, Vec<Type>> = HashMap::new();
        let mut sinks: HashMap<MethodId, Vec<usize>> = HashMap::new();
        let mut transfers: HashMap<MethodId, Vec<TransferRule>> = HashMap::new();
        for rule in config.sources {
            sources.entry(rule.method).or_default().push(rule.ty);
        }
        for rule in config.sinks {
            sinks.entry(rule.method).or_default().push(rule.index);
        }
        for rule in config.transfers {
            transfers.entry(rule.method).or_default().push(rule);
        }
        TaintAnalysis {
            sources,
            sinks,
            transfers,
        }
    }

    /// The taint type a source call produces, if `callee` is a configured
    /// source whose declared type matches its return type.
    pub fn source_type(&self, callee: MethodId, ret_ty: &Type) -> Option<Type> {
        self.sources
            .get(&callee)?
            .iter()
            .find(|ty| *ty == ret_ty)
            .cloned()
    }

    pub fn has_transfer(&self, callee: MethodId) -> bool {
        self.transfers.contains_key(&callee)
    }

    pub fn transfers_for(&self, callee: MethodId) -> Vec<TransferRule> {
        self.transfers.get(&callee).cloned().unwrap_or_default()
    }

    pub fn sink_indices(&self, callee: MethodId) -> Vec<usize> {
        self.sinks.get(&callee).cloned().unwrap_or_default()
    }
}

/// Resolves a transfer endpoint to the call-site variable it names.
pub(crate) fn endpoint_var(
    point: TransferPoint,
    exp: &InvokeExp,
    result: Option<VarId>,
) -> Option<VarId> {
    match point {
        TransferPoint::Base => exp.base,
        TransferPoint::Result => result,
        TransferPoint::Arg(i) => exp.args.get(i).copied(),
    }
}

/// An object originating at `source` reached the call site `sink` at
/// argument position `index`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TaintFlow {
    pub source: StmtId,
    pub sink: StmtId,
    pub index: usize,
}
