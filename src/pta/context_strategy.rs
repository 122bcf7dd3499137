// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context selectors for the context-sensitive analysis.
//!
//! A selector decides the callee context at each call edge and the heap
//! context at each allocation; the solver treats the returned
//! [`ContextId`]s as opaque. Each selector owns its interning cache, so
//! equal context tuples map to one id for the lifetime of an analysis.

use super::heap::ObjId;
use crate::ir::context::{Context, ContextCache, ContextId};
use crate::ir::{MethodId, StmtId};

pub trait ContextSelector {
    fn empty_context(&mut self) -> ContextId;

    /// The callee context of a static call edge.
    fn select_context(&mut self, caller_ctx: ContextId, site: StmtId, callee: MethodId)
        -> ContextId;

    /// The callee context of an instance call edge, given the receiver
    /// object and its heap context.
    fn select_context_with_recv(
        &mut self,
        caller_ctx: ContextId,
        site: StmtId,
        recv_ctx: ContextId,
        recv_obj: ObjId,
        callee: MethodId,
    ) -> ContextId;

    /// The heap context of an allocation inside a method analyzed under
    /// `method_ctx`.
    fn select_heap_context(&mut self, method_ctx: ContextId, obj: ObjId) -> ContextId;
}

/// k-limited call-site sensitivity: callee contexts are the `k` most
/// recent call sites; heap contexts are truncated to `k - 1`.
pub struct KCallSiteSensitive {
    k: usize,
    cache: ContextCache<StmtId>,
}

impl KCallSiteSensitive {
    pub fn new(k: usize) -> Self {
        KCallSiteSensitive {
            k,
            cache: ContextCache::new(),
        }
    }

    fn context_of(&self, id: ContextId) -> std::rc::Rc<Context<StmtId>> {
        self.cache.get_context(id).expect("unknown context id")
    }
}

impl ContextSelector for KCallSiteSensitive {
    fn empty_context(&mut self) -> ContextId {
        self.cache.empty_context_id()
    }

    fn select_context(
        &mut self,
        caller_ctx: ContextId,
        site: StmtId,
        _callee: MethodId,
    ) -> ContextId {
        let ctx = Context::new_k_limited(&self.context_of(caller_ctx), site, self.k);
        self.cache.get_context_id(&ctx)
    }

    fn select_context_with_recv(
        &mut self,
        caller_ctx: ContextId,
        site: StmtId,
        _recv_ctx: ContextId,
        _recv_obj: ObjId,
        callee: MethodId,
    ) -> ContextId {
        self.select_context(caller_ctx, site, callee)
    }

    fn select_heap_context(&mut self, method_ctx: ContextId, _obj: ObjId) -> ContextId {
        let limit = self.k.saturating_sub(1);
        let ctx = Context::truncated(&self.context_of(method_ctx), limit);
        self.cache.get_context_id(&ctx)
    }
}

/// k-limited object sensitivity: callee contexts of instance calls are the
/// receiver's heap context extended by the receiver object; static calls
/// keep the caller context.
pub struct KObjectSensitive {
    k: usize,
    cache: ContextCache<ObjId>,
}

impl KObjectSensitive {
    pub fn new(k: usize) -> Self {
        KObjectSensitive {
            k,
            cache: ContextCache::new(),
        }
    }

    fn context_of(&self, id: ContextId) -> std::rc::Rc<Context<ObjId>> {
        self.cache.get_context(id).expect("unknown context id")
    }
}

impl ContextSelector for KObjectSensitive {
    fn empty_context(&mut self) -> ContextId {
        self.cache.empty_context_id()
    }

    fn select_context(
        &mut self,
        caller_ctx: ContextId,
        _site: StmtId,
        _callee: MethodId,
    ) -> ContextId {
        caller_ctx
    }

    fn select_context_with_recv(
        &mut self,
        _caller_ctx: ContextId,
        _site: StmtId,
        recv_ctx: ContextId,
        recv_obj: ObjId,
        _callee: MethodId,
    ) -> ContextId {
        let ctx = Context::new_k_limited(&self.context_of(recv_ctx), recv_obj, self.k);
        self.cache.get_context_id(&ctx)
    }

    fn select_heap_context(&mut self, method_ctx: ContextId, _obj: ObjId) -> ContextId {
        let limit = self.k.saturating_sub(1);
        let ctx = Context::truncated(&self.context_of(method_ctx), limit);
        self.cache.get_context_id(&ctx)
    }
}

/// The context-insensitive selector: everything lives in the empty
/// context. Useful as a baseline and in tests of the CS machinery.
pub struct ContextInsensitiveSelector {
    cache: ContextCache<StmtId>,
}

impl ContextInsensitiveSelector {
    pub fn new() -> Self {
        ContextInsensitiveSelector {
            cache: ContextCache::new(),
        }
    }
}

impl Default for ContextInsensitiveSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextSelector for ContextInsensitiveSelector {
    fn empty_context(&mut self) -> ContextId {
        self.cache.empty_context_id()
    }

    fn select_context(
        &mut self,
        _caller_ctx: ContextId,
        _site: StmtId,
        _callee: MethodId,
    ) -> ContextId {
        self.cache.empty_context_id()
    }

    fn select_context_with_recv(
        &mut self,
        _caller_ctx: ContextId,
        _site: StmtId,
        _recv_ctx: ContextId,
        _recv_obj: ObjId,
        _callee: MethodId,
    ) -> ContextId {
        self.cache.empty_context_id()
    }

    fn select_heap_context(&mut self, _method_ctx: ContextId, _obj: ObjId) -> ContextId {
        self.cache.empty_context_id()
    }
}
