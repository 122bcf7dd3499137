// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Calling contexts for the context-sensitive analyses.
//!
//! A context is an opaque, equality-comparable tuple of elements chosen by
//! a context selector (call sites or heap objects). Contexts are interned:
//! equal tuples always map to the same [`ContextId`], so identity
//! comparison is equivalent to structural equality across the whole
//! analysis.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::hash::Hash;
use std::rc::Rc;

use super::StmtId;
use crate::util::bit_vec::Idx;

crate::index_type! {
    /// The unique identifier for each interned context.
    pub struct ContextId
}

pub trait ContextElement: Clone + Eq + PartialEq + Debug + Hash {}

// Call sites are the elements of call-site sensitivity.
impl ContextElement for StmtId {}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Context<E: ContextElement> {
    elems: Vec<E>,
}

impl<E: ContextElement> Debug for Context<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.elems.fmt(f)
    }
}

impl<E: ContextElement> Context<E> {
    pub fn new_empty() -> Rc<Self> {
        Rc::new(Context { elems: Vec::new() })
    }

    pub fn new(elems: Vec<E>) -> Rc<Self> {
        Rc::new(Context { elems })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// Composes a new context by prepending `elem` to `old_ctx`, keeping at
    /// most `k` elements (the oldest is discarded on overflow).
    pub fn new_k_limited(old_ctx: &Rc<Context<E>>, elem: E, k: usize) -> Rc<Self> {
        let mut elems = Vec::with_capacity(k);
        if k > 0 {
            elems.push(elem);
            let keep = (k - 1).min(old_ctx.len());
            elems.extend_from_slice(&old_ctx.elems[..keep]);
        }
        Rc::new(Context { elems })
    }

    /// Truncates `ctx` to its `k` most recent elements.
    pub fn truncated(ctx: &Rc<Context<E>>, k: usize) -> Rc<Self> {
        if ctx.len() <= k {
            ctx.clone()
        } else {
            Rc::new(Context {
                elems: ctx.elems[..k].to_vec(),
            })
        }
    }

    pub fn first_element(&self) -> Option<&E> {
        self.elems.first()
    }
}

/// Interns contexts so that equal tuples share one [`ContextId`]. Id 0 is
/// always the empty context.
#[derive(Debug)]
pub struct ContextCache<E: ContextElement> {
    context_list: Vec<Rc<Context<E>>>,
    context_to_id: HashMap<Rc<Context<E>>, ContextId>,
}

impl<E: ContextElement> ContextCache<E> {
    pub fn new() -> ContextCache<E> {
        let mut cache = ContextCache {
            context_list: Vec::new(),
            context_to_id: HashMap::new(),
        };
        cache.get_context_id(&Context::new_empty());
        cache
    }

    pub fn empty_context_id(&self) -> ContextId {
        ContextId::new(0)
    }

    pub fn get_context_id(&mut self, context: &Rc<Context<E>>) -> ContextId {
        if let Some(id) = self.context_to_id.get(context) {
            *id
        } else {
            let id = ContextId::new(self.context_list.len());
            self.context_list.push(context.clone());
            self.context_to_id.insert(context.clone(), id);
            id
        }
    }

    pub fn get_context(&self, id: ContextId) -> Option<Rc<Context<E>>> {
        self.context_list.get(id.index()).cloned()
    }

    pub fn len(&self) -> usize {
        self.context_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.context_list.is_empty()
    }
}

impl<E: ContextElement> Default for ContextCache<E> {
    fn default() -> Self {
        Self::new()
    }
}
