//! The inhabitation solver.
//!
//! `inhabited(ty)` answers from the memo when the node is already decided.
//! Otherwise it evaluates the node's stored derivations, building one from
//! the node's structure only the first time the node is seen. Entries are
//! checked against [`Heap::fingerprint`], so resolving a hole below a node
//! makes the solver derive it again from its new shape. Nodes that are
//! re-entered while being solved (a recursive type's body reaching the type
//! again) evaluate to unknown.

use super::expr::{TiExpr, TiOp};
use super::memo::{Derivation, MemoStats, TiMemo};
use super::ternary::TiVal;
use crate::error::{Contradiction, TiError};
use crate::heap::Heap;
use crate::predicates::{EqualityOptions, term_equal};
use crate::query_trace;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::{Addr, Depth, Literal, NodeData, Prim};
use crate::visitor::{NodeVisitor, node_guide_data};
use tg_common::Atom;
use tg_common::limits::{MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE};
use tracing::{debug, error};

pub struct InhabitSolver<'a> {
    heap: &'a mut Heap,
    memo: &'a mut TiMemo,
    guard: RecursionGuard<Addr>,
}

impl<'a> InhabitSolver<'a> {
    pub fn new(heap: &'a mut Heap, memo: &'a mut TiMemo) -> Self {
        InhabitSolver {
            heap,
            memo,
            guard: RecursionGuard::with_profile(RecursionProfile::Inhabitation),
        }
    }

    pub fn stats(&self) -> MemoStats {
        self.memo.stats()
    }

    /// Whether `ty` has inhabitants, as far as can be decided.
    ///
    /// An `Err` means a derivation contradicted itself: an internal defect,
    /// not a property of `ty`.
    pub fn inhabited(&mut self, ty: Addr) -> Result<TiVal, TiError> {
        let query = query_trace::unary_start("inhabited", ty);
        let hits_before = self.memo.stats().memo_hits;
        let result = self.solve(ty);
        let cache_hit = self.memo.stats().memo_hits > hits_before;
        query_trace::end(query, "inhabited", &result, cache_hit);
        result
    }

    fn solve(&mut self, node: Addr) -> Result<TiVal, TiError> {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.solve_inner(node))
    }

    fn solve_inner(&mut self, node: Addr) -> Result<TiVal, TiError> {
        let fingerprint = self.heap.fingerprint(node);
        if let Some(value) = self.memo.resolved(node, fingerprint) {
            self.memo.stats_mut().memo_hits += 1;
            return Ok(value);
        }

        match self.guard.enter(node) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return Ok(TiVal::UNKNOWN),
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                debug!(%node, "inhabitation budget exhausted");
                return Ok(TiVal::UNKNOWN);
            }
        }
        let result = self.solve_entered(node, fingerprint);
        self.guard.leave(node);
        result
    }

    fn solve_entered(&mut self, node: Addr, fingerprint: u64) -> Result<TiVal, TiError> {
        let mut derivations = self.memo.take_derivations(node, fingerprint);
        if derivations.is_empty() {
            derivations.push(self.derive(node));
            self.memo.stats_mut().derivations += 1;
        }

        let mut merged = TiVal::UNKNOWN;
        let mut causes = Vec::new();
        let mut outcome = Ok(());
        for derivation in &mut derivations {
            let value = match self.evaluate(node, &derivation.rule, &mut derivation.expr) {
                Ok(value) => value,
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            };
            let next = TiVal {
                uninhabited: merged.uninhabited || value.uninhabited,
                inhabited: merged.inhabited || value.inhabited,
            };
            if value.is_decided() {
                causes.extend(derivation.expr.causes.iter().copied());
            }
            if next.is_contradiction() {
                outcome = Err(self.contradiction(node, "merge", causes.clone()));
                break;
            }
            merged = next;
        }

        let value = outcome.map(|()| merged);
        let decided = value.as_ref().ok().copied();
        self.memo
            .store(node, fingerprint, decided, derivations, causes);
        value
    }

    fn evaluate(&mut self, node: Addr, rule: &str, expr: &mut TiExpr) -> Result<TiVal, TiError> {
        if let Some(value) = expr.value {
            return Ok(value);
        }

        let (value, causes) = match &mut expr.op {
            TiOp::Const(value) => (*value, Vec::new()),
            TiOp::Ref(target) => {
                let target = *target;
                (self.solve(target)?, vec![target])
            }
            TiOp::And(left, right) => {
                let l = self.evaluate(node, rule, left)?;
                if l.is_false() {
                    (l, left.causes.clone())
                } else {
                    let r = self.evaluate(node, rule, right)?;
                    let causes = if r.is_false() {
                        right.causes.clone()
                    } else {
                        concat(&left.causes, &right.causes)
                    };
                    (l.and(r), causes)
                }
            }
            TiOp::Or(left, right) => {
                let l = self.evaluate(node, rule, left)?;
                if l.is_true() {
                    (l, left.causes.clone())
                } else {
                    let r = self.evaluate(node, rule, right)?;
                    let causes = if r.is_true() {
                        right.causes.clone()
                    } else {
                        concat(&left.causes, &right.causes)
                    };
                    (l.or(r), causes)
                }
            }
            TiOp::AndImplicative(premise, consequence) => {
                let p = self.evaluate(node, rule, premise)?;
                let c = self.evaluate(node, rule, consequence)?;
                let causes = concat(&premise.causes, &consequence.causes);
                match TiVal::and_imp(p, c) {
                    Some(value) => (value, causes),
                    None => return Err(self.contradiction(node, rule, causes)),
                }
            }
            TiOp::OrImplicative(premise, consequence) => {
                let p = self.evaluate(node, rule, premise)?;
                let c = self.evaluate(node, rule, consequence)?;
                let causes = concat(&premise.causes, &consequence.causes);
                match TiVal::or_imp(p, c) {
                    Some(value) => (value, causes),
                    None => return Err(self.contradiction(node, rule, causes)),
                }
            }
            TiOp::Not(inner) => {
                let v = self.evaluate(node, rule, inner)?;
                (v.not(), inner.causes.clone())
            }
        };
        Ok(expr.settle(value, causes))
    }

    fn contradiction(&self, node: Addr, rule: &str, causes: Vec<Addr>) -> TiError {
        error!(
            %node,
            rule,
            causes = ?causes,
            ty = %self.heap.display(node),
            "inhabitation contradiction"
        );
        TiError::Contradiction(Contradiction {
            node,
            rule: rule.to_string(),
            causes,
        })
    }

    fn derive(&mut self, node: Addr) -> Derivation {
        let current = self.heap.node(node).clone();
        let mut rules = DeriveRules {
            heap: &mut *self.heap,
        };
        let (rule, expr) = node_guide_data(&mut rules, node, current.depth, &current.data);
        debug!(%node, rule, "derived inhabitation rule");
        Derivation {
            rule: rule.to_string(),
            expr,
        }
    }
}

fn concat(a: &[Addr], b: &[Addr]) -> Vec<Addr> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

/// One-shot query with a throwaway solver.
pub fn type_inhabited(heap: &mut Heap, memo: &mut TiMemo, ty: Addr) -> Result<TiVal, TiError> {
    InhabitSolver::new(heap, memo).inhabited(ty)
}

// =============================================================================
// Structural rules
// =============================================================================

struct DeriveRules<'h> {
    heap: &'h mut Heap,
}

/// Outermost constructor of a type, where it rules out overlap.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Head {
    Named(Atom),
    Function,
    Universe,
}

impl DeriveRules<'_> {
    fn head(&self, ty: Addr) -> Option<Head> {
        match &self.heap.direct_node(ty).data {
            NodeData::TyFun { .. } => Some(Head::Function),
            NodeData::Primitive {
                prim: Prim::Named(atom),
                ..
            } => Some(Head::Named(*atom)),
            NodeData::Primitive {
                prim: Prim::Type, ..
            } => Some(Head::Universe),
            _ => None,
        }
    }

    fn union_parts(&self, ty: Addr) -> Option<(Addr, Addr)> {
        match self.heap.direct_node(ty).data.as_primitive() {
            Some((Prim::Union, &[a, b])) => Some((a, b)),
            _ => None,
        }
    }

    fn intersection(&mut self, depth: Depth, a: Addr, b: Addr) -> (&'static str, TiExpr) {
        if let (Some(ha), Some(hb)) = (self.head(a), self.head(b)) {
            if ha != hb {
                return ("intersection_disjoint", TiExpr::constant(TiVal::FALSE));
            }
        }
        if self.heap.is_prim(a, Prim::Any) {
            return ("intersection_any", TiExpr::reference(b));
        }
        if self.heap.is_prim(b, Prim::Any) {
            return ("intersection_any", TiExpr::reference(a));
        }
        if term_equal(self.heap, a, b, EqualityOptions::default()) == Some(true) {
            return ("intersection_equal", TiExpr::reference(a));
        }
        if let Some((x, y)) = self.union_parts(a) {
            let left = self.heap.intersection(depth, x, b).addr();
            let right = self.heap.intersection(depth, y, b).addr();
            return (
                "intersection_distribute",
                TiExpr::or(TiExpr::reference(left), TiExpr::reference(right)),
            );
        }
        if let Some((x, y)) = self.union_parts(b) {
            let left = self.heap.intersection(depth, a, x).addr();
            let right = self.heap.intersection(depth, a, y).addr();
            return (
                "intersection_distribute",
                TiExpr::or(TiExpr::reference(left), TiExpr::reference(right)),
            );
        }
        // Empty if either side is; nothing more is known.
        (
            "intersection",
            TiExpr::and(
                TiExpr::and(TiExpr::reference(a), TiExpr::reference(b)),
                TiExpr::constant(TiVal::UNKNOWN),
            ),
        )
    }

    fn binder_body(&self, lambda: Addr) -> Option<Addr> {
        match self.heap.direct_node(lambda).data {
            NodeData::TmLambda { body, .. } => Some(body),
            _ => None,
        }
    }
}

fn unknown(rule: &'static str) -> (&'static str, TiExpr) {
    (rule, TiExpr::constant(TiVal::UNKNOWN))
}

impl NodeVisitor for DeriveRules<'_> {
    type Output = (&'static str, TiExpr);

    fn visit_tm_var(&mut self, _addr: Addr, _depth: Depth) -> Self::Output {
        unknown("variable")
    }

    fn visit_ty_var(&mut self, _addr: Addr, _depth: Depth) -> Self::Output {
        unknown("variable")
    }

    fn visit_tm_lambda(&mut self, _: Addr, _: Depth, _: Addr, _: Addr) -> Self::Output {
        unknown("term")
    }

    fn visit_ty_fun(
        &mut self,
        _addr: Addr,
        _depth: Depth,
        domain: Addr,
        codomain: Addr,
    ) -> Self::Output {
        (
            "function",
            TiExpr::or(
                TiExpr::not(TiExpr::reference(domain)),
                TiExpr::reference(codomain),
            ),
        )
    }

    fn visit_primitive(
        &mut self,
        _addr: Addr,
        depth: Depth,
        prim: Prim,
        args: &[Addr],
    ) -> Self::Output {
        match (prim, args) {
            (Prim::SelfTy, &[lambda]) => match self.binder_body(lambda) {
                Some(body) => ("self", TiExpr::reference(body)),
                None => unknown("malformed"),
            },
            (Prim::Fix, &[lambda]) => match self.binder_body(lambda) {
                Some(body) => ("fix", TiExpr::reference(body)),
                None => unknown("malformed"),
            },
            (Prim::Sub, &[sub, sup]) => (
                "sub_bound",
                TiExpr::and_imp(TiExpr::reference(sub), TiExpr::reference(sup)),
            ),
            (Prim::Super, &[sup, sub]) => (
                "super_bound",
                TiExpr::or_imp(TiExpr::reference(sub), TiExpr::reference(sup)),
            ),
            (Prim::Union, &[a, b]) => (
                "union",
                TiExpr::or(TiExpr::reference(a), TiExpr::reference(b)),
            ),
            (Prim::Intersection, &[a, b]) => self.intersection(depth, a, b),
            (Prim::Any, []) => ("any", TiExpr::constant(TiVal::TRUE)),
            (Prim::Type, _) => ("universe", TiExpr::constant(TiVal::TRUE)),
            (Prim::Unknown, _) => unknown("hole"),
            (Prim::Named(_), []) => ("constructor", TiExpr::constant(TiVal::TRUE)),
            (Prim::Named(_), _) => unknown("applied_constructor"),
            (
                Prim::SelfTy
                | Prim::Fix
                | Prim::Sub
                | Prim::Super
                | Prim::Union
                | Prim::Intersection
                | Prim::Any,
                _,
            ) => unknown("malformed"),
        }
    }

    fn visit_tm_pair(&mut self, _: Addr, _: Depth, _: Addr, _: Addr) -> Self::Output {
        unknown("term")
    }

    fn visit_tm_app(&mut self, _: Addr, _: Depth, _: Addr, _: Addr) -> Self::Output {
        unknown("term")
    }

    fn visit_literal(&mut self, _addr: Addr, _depth: Depth, _literal: Literal) -> Self::Output {
        ("literal", TiExpr::constant(TiVal::TRUE))
    }

    fn visit_opaque(&mut self, _addr: Addr, _depth: Depth, _ty: Addr) -> Self::Output {
        unknown("opaque")
    }

    fn visit_pending(&mut self, _addr: Addr, _depth: Depth) -> Self::Output {
        unknown("pending")
    }

    fn visit_indirection(&mut self, _addr: Addr, _depth: Depth, target: Addr) -> Self::Output {
        ("indirection", TiExpr::reference(target))
    }
}
