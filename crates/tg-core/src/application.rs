//! Type-level application.
//!
//! `apply(f, a)` reduces the application of function type `f` to argument
//! type `a`, dispatching on the resolved form of `f`:
//!
//! | form of `f`          | result                                                   |
//! |----------------------|----------------------------------------------------------|
//! | `(x : d) -> c`       | `c` with `x` replaced by an opaque term of type `a`      |
//! | `Any`                | `Any`                                                    |
//! | `Self(λs. body)`     | `Self(λs'. apply(body[s := s'], a))`, one level deeper   |
//! | `Fix(λr. body)`      | `apply(body[r := f], a)`                                 |
//! | `{<:}`, `{:>}`, `{\|}` | the same operator over both sides applied to `a`       |
//! | `{&}(g, h)`          | `g` or `h` applied, if `a` is provably outside the other's domain |
//! | anything else        | stuck                                                    |
//!
//! Stuck applications return `Ok(None)`. They are not failures: the caller
//! may retry once more of the graph is resolved. The only error is a
//! contradiction surfaced by the inhabitation solver while deciding an
//! intersection.
//!
//! Results are built at the call depth, `max(depth f, depth a)` unless a
//! deeper depth is requested with [`ApplicationEvaluator::apply_at`].

use crate::error::TiError;
use crate::heap::Heap;
use crate::inhabit::{InhabitSolver, TiMemo};
use crate::query_trace;
use crate::recursion::{DepthCounter, RecursionProfile};
use crate::subst::{SubstEnv, subst_tm_ty};
use crate::types::{Addr, Depth, NodeData, Prim, TypeAddr};
use tracing::{debug, trace};

pub struct ApplicationEvaluator<'a> {
    heap: &'a mut Heap,
    memo: &'a mut TiMemo,
    /// Nesting of application steps (Self re-wrapping, Fix unrolling,
    /// distribution) within one call.
    depth: DepthCounter,
}

impl<'a> ApplicationEvaluator<'a> {
    pub fn new(heap: &'a mut Heap, memo: &'a mut TiMemo) -> Self {
        ApplicationEvaluator {
            heap,
            memo,
            depth: DepthCounter::with_profile(RecursionProfile::Application),
        }
    }

    pub fn apply(
        &mut self,
        func: TypeAddr,
        arg: TypeAddr,
    ) -> Result<Option<TypeAddr>, TiError> {
        self.apply_at(func, arg, 0)
    }

    /// Apply at `call_depth`, raised to at least the depths of `func` and
    /// `arg`.
    pub fn apply_at(
        &mut self,
        func: TypeAddr,
        arg: TypeAddr,
        call_depth: Depth,
    ) -> Result<Option<TypeAddr>, TiError> {
        let (func, arg) = (func.addr(), arg.addr());
        let call = call_depth
            .max(self.heap.depth(func))
            .max(self.heap.depth(arg));

        let query = query_trace::binary_start("apply", func, arg);
        let result = self.step(func, arg, call);
        query_trace::end(query, "apply", &result, false);
        Ok(result?.map(TypeAddr::new_unchecked))
    }

    fn step(&mut self, func: Addr, arg: Addr, call: Depth) -> Result<Option<Addr>, TiError> {
        if !self.depth.enter() {
            debug!(%func, %arg, "application depth exhausted; treating as stuck");
            return Ok(None);
        }
        let result = self.step_inner(func, arg, call);
        self.depth.leave();
        result
    }

    fn step_inner(&mut self, func: Addr, arg: Addr, call: Depth) -> Result<Option<Addr>, TiError> {
        let direct = self.heap.direct_addr_of(func).addr();
        let node = self.heap.node(direct).clone();
        let call = call.max(node.depth);

        let result = match &node.data {
            NodeData::TyFun { codomain, .. } => {
                let witness = self.heap.opaque(call, arg);
                let env = SubstEnv::term(witness);
                Some(subst_tm_ty(
                    self.heap,
                    call,
                    node.depth + 1,
                    &env,
                    None,
                    *codomain,
                ))
            }
            NodeData::Primitive { prim, args } => match (*prim, args.as_slice()) {
                (Prim::Any, _) => Some(self.heap.any().addr()),
                (Prim::SelfTy, &[lambda]) => self.apply_self(lambda, arg, call)?,
                (Prim::Fix, &[lambda]) => self.apply_fix(direct, lambda, arg, call)?,
                (Prim::Sub, &[sub, sup]) => self
                    .distribute(sub, sup, arg, call)?
                    .map(|(sub, sup)| self.heap.sub_bound(call, sub, sup).addr()),
                (Prim::Super, &[sup, sub]) => self
                    .distribute(sup, sub, arg, call)?
                    .map(|(sup, sub)| self.heap.super_bound(call, sup, sub).addr()),
                (Prim::Union, &[a, b]) => self
                    .distribute(a, b, arg, call)?
                    .map(|(a, b)| self.heap.union(call, a, b).addr()),
                (Prim::Intersection, &[g, h]) => self.apply_intersection(g, h, arg, call)?,
                _ => None,
            },
            NodeData::TmVar
            | NodeData::TyVar
            | NodeData::TmLambda { .. }
            | NodeData::TmPair { .. }
            | NodeData::TmApp { .. }
            | NodeData::Literal(_)
            | NodeData::Opaque { .. }
            | NodeData::Pending
            | NodeData::Indirection(_) => None,
        };

        trace!(%func, %arg, call, result = ?result, kind = node.data.kind_name(), "apply step");
        Ok(result)
    }

    /// Apply both sides; stuck if either side is.
    fn distribute(
        &mut self,
        a: Addr,
        b: Addr,
        arg: Addr,
        call: Depth,
    ) -> Result<Option<(Addr, Addr)>, TiError> {
        let Some(a) = self.step(a, arg, call)? else {
            return Ok(None);
        };
        let Some(b) = self.step(b, arg, call)? else {
            return Ok(None);
        };
        Ok(Some((a, b)))
    }

    fn lambda_parts(&self, lambda: Addr) -> Option<(Depth, Addr)> {
        let node = self.heap.direct_node(lambda);
        match node.data {
            NodeData::TmLambda { body, .. } => Some((node.depth, body)),
            _ => None,
        }
    }

    fn apply_self(&mut self, lambda: Addr, arg: Addr, call: Depth) -> Result<Option<Addr>, TiError> {
        let Some((binder, body)) = self.lambda_parts(lambda) else {
            return Ok(None);
        };
        let inner = call + 1;
        let this = self.heap.tm_var(inner);
        let body = subst_tm_ty(
            self.heap,
            inner,
            binder + 1,
            &SubstEnv::term(this),
            None,
            body,
        );
        let Some(result) = self.step(body, arg, inner)? else {
            return Ok(None);
        };
        let lambda = self.heap.tm_lambda(call, this, result);
        Ok(Some(self.heap.prim(call, Prim::SelfTy, &[lambda])))
    }

    fn apply_fix(
        &mut self,
        fix: Addr,
        lambda: Addr,
        arg: Addr,
        call: Depth,
    ) -> Result<Option<Addr>, TiError> {
        let Some((binder, body)) = self.lambda_parts(lambda) else {
            return Ok(None);
        };
        let unrolled = subst_tm_ty(
            self.heap,
            binder,
            binder + 1,
            &SubstEnv::ty(fix),
            None,
            body,
        );
        self.step(unrolled, arg, call)
    }

    fn apply_intersection(
        &mut self,
        g: Addr,
        h: Addr,
        arg: Addr,
        call: Depth,
    ) -> Result<Option<Addr>, TiError> {
        let (Some(dom_g), Some(dom_h)) = (self.domain_of(g), self.domain_of(h)) else {
            return Ok(None);
        };
        let outside_g = self.outside_domain(arg, dom_g, call)?;
        let outside_h = self.outside_domain(arg, dom_h, call)?;
        match (outside_g, outside_h) {
            (true, false) => self.step(h, arg, call),
            (false, true) => self.step(g, arg, call),
            _ => {
                debug!(%g, %h, %arg, outside_g, outside_h, "ambiguous intersection application");
                Ok(None)
            }
        }
    }

    fn domain_of(&self, ty: Addr) -> Option<Addr> {
        match self.heap.direct_node(ty).data {
            NodeData::TyFun { domain, .. } => Some(domain),
            _ => None,
        }
    }

    /// `arg` is provably outside `domain`: their intersection is uninhabited.
    fn outside_domain(&mut self, arg: Addr, domain: Addr, call: Depth) -> Result<bool, TiError> {
        let overlap = self.heap.intersection(call, arg, domain).addr();
        let verdict = InhabitSolver::new(self.heap, self.memo).inhabited(overlap)?;
        Ok(verdict.is_false())
    }
}

/// One-shot application with a throwaway evaluator.
pub fn apply(
    heap: &mut Heap,
    memo: &mut TiMemo,
    func: TypeAddr,
    arg: TypeAddr,
) -> Result<Option<TypeAddr>, TiError> {
    ApplicationEvaluator::new(heap, memo).apply(func, arg)
}
