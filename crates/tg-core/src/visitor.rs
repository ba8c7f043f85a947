//! Exhaustive dispatch over node kinds.
//!
//! [`NodeVisitor`] has one method per [`NodeData`] variant and no defaults,
//! and [`node_guide`] dispatches with a match that has no wildcard arm. Adding
//! a node kind is therefore a build failure in every visitor until it is
//! handled.
//!
//! ```ignore
//! struct IsVar;
//!
//! impl NodeVisitor for IsVar {
//!     type Output = bool;
//!     fn visit_tm_var(&mut self, _: Addr, _: Depth) -> bool { true }
//!     fn visit_ty_var(&mut self, _: Addr, _: Depth) -> bool { true }
//!     // ... every other kind returns false
//! }
//!
//! let is_var = node_guide(&heap, &mut IsVar, addr);
//! ```

use crate::heap::Heap;
use crate::types::{Addr, Depth, Literal, NodeData, Prim};

pub trait NodeVisitor {
    type Output;

    fn visit_tm_var(&mut self, addr: Addr, depth: Depth) -> Self::Output;
    fn visit_ty_var(&mut self, addr: Addr, depth: Depth) -> Self::Output;
    fn visit_tm_lambda(
        &mut self,
        addr: Addr,
        depth: Depth,
        pattern: Addr,
        body: Addr,
    ) -> Self::Output;
    fn visit_ty_fun(
        &mut self,
        addr: Addr,
        depth: Depth,
        domain: Addr,
        codomain: Addr,
    ) -> Self::Output;
    fn visit_primitive(
        &mut self,
        addr: Addr,
        depth: Depth,
        prim: Prim,
        args: &[Addr],
    ) -> Self::Output;
    fn visit_tm_pair(
        &mut self,
        addr: Addr,
        depth: Depth,
        first: Addr,
        second: Addr,
    ) -> Self::Output;
    fn visit_tm_app(&mut self, addr: Addr, depth: Depth, func: Addr, arg: Addr) -> Self::Output;
    fn visit_literal(&mut self, addr: Addr, depth: Depth, literal: Literal) -> Self::Output;
    fn visit_opaque(&mut self, addr: Addr, depth: Depth, ty: Addr) -> Self::Output;
    fn visit_pending(&mut self, addr: Addr, depth: Depth) -> Self::Output;
    fn visit_indirection(&mut self, addr: Addr, depth: Depth, target: Addr) -> Self::Output;
}

/// Dispatch on the node stored at `addr` (without resolving indirections).
pub fn node_guide<V: NodeVisitor>(heap: &Heap, visitor: &mut V, addr: Addr) -> V::Output {
    let node = heap.node(addr);
    node_guide_data(visitor, addr, node.depth, &node.data)
}

pub fn node_guide_data<V: NodeVisitor>(
    visitor: &mut V,
    addr: Addr,
    depth: Depth,
    data: &NodeData,
) -> V::Output {
    match data {
        NodeData::TmVar => visitor.visit_tm_var(addr, depth),
        NodeData::TyVar => visitor.visit_ty_var(addr, depth),
        NodeData::TmLambda { pattern, body } => {
            visitor.visit_tm_lambda(addr, depth, *pattern, *body)
        }
        NodeData::TyFun { domain, codomain } => {
            visitor.visit_ty_fun(addr, depth, *domain, *codomain)
        }
        NodeData::Primitive { prim, args } => visitor.visit_primitive(addr, depth, *prim, args),
        NodeData::TmPair { first, second } => visitor.visit_tm_pair(addr, depth, *first, *second),
        NodeData::TmApp { func, arg } => visitor.visit_tm_app(addr, depth, *func, *arg),
        NodeData::Literal(literal) => visitor.visit_literal(addr, depth, *literal),
        NodeData::Opaque { ty } => visitor.visit_opaque(addr, depth, *ty),
        NodeData::Pending => visitor.visit_pending(addr, depth),
        NodeData::Indirection(target) => visitor.visit_indirection(addr, depth, *target),
    }
}
