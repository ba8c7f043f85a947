//! Capture-avoiding substitution with depth shifting.
//!
//! `subst_tm_ty(heap, t, v, env, expected, expr)` eliminates the binder whose
//! variable lives at level `v`:
//!
//! - nodes with depth `< v` cannot mention the variable and are shared as-is;
//! - the variable at level `v` (of the environment's kind) becomes the
//!   environment's value;
//! - every other node at depth `>= v`, variables included, is rebuilt at its
//!   depth shifted by `t - v`.
//!
//! `Self` and `Fix` are rewritten structurally like any other node; they are
//! never unrolled here. Unrolling is the application engine's job.

use crate::heap::Heap;
use crate::predicates::is_var_used;
use crate::rewrite::{RewriteRule, Rewriter};
use crate::types::{Addr, Depth, Node, NodeData, VarKind};
use tracing::{trace, warn};

/// A single-slot environment: the variable being eliminated and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstEnv {
    pub kind: VarKind,
    pub value: Addr,
}

impl SubstEnv {
    /// Replace a term variable.
    pub fn term(value: Addr) -> Self {
        SubstEnv {
            kind: VarKind::Term,
            value,
        }
    }

    /// Replace a type variable.
    pub fn ty(value: Addr) -> Self {
        SubstEnv {
            kind: VarKind::Type,
            value,
        }
    }
}

struct SubstRule {
    target_depth: Depth,
    var_depth: Depth,
    env: SubstEnv,
}

impl SubstRule {
    fn shift(&self, depth: Depth) -> Depth {
        let shifted = i64::from(depth) + i64::from(self.target_depth) - i64::from(self.var_depth);
        Depth::try_from(shifted).unwrap_or_else(|_| {
            panic!(
                "substitution from level {} to {} shifts depth {depth} below zero",
                self.var_depth, self.target_depth
            )
        })
    }
}

impl RewriteRule for SubstRule {
    fn shortcut(&mut self, heap: &mut Heap, addr: Addr, node: &Node) -> Option<Addr> {
        if node.depth < self.var_depth {
            return Some(addr);
        }
        match node.data {
            NodeData::TmVar | NodeData::TyVar => {
                let kind = node.data.var_kind()?;
                if node.depth == self.var_depth && kind == self.env.kind {
                    Some(self.env.value)
                } else {
                    Some(heap.var(kind, self.shift(node.depth)))
                }
            }
            NodeData::Pending => {
                warn!(%addr, "substituting through an unfilled slot; sharing it unchanged");
                Some(addr)
            }
            NodeData::TmLambda { .. }
            | NodeData::TyFun { .. }
            | NodeData::Primitive { .. }
            | NodeData::TmPair { .. }
            | NodeData::TmApp { .. }
            | NodeData::Literal(_)
            | NodeData::Opaque { .. }
            | NodeData::Indirection(_) => None,
        }
    }

    fn rebuilt_depth(&self, depth: Depth) -> Depth {
        self.shift(depth)
    }
}

/// Substitute `env.value` for the variable at `var_depth` in `expr`, moving
/// the result to `target_depth`.
///
/// When `expected_type` is given it is substituted in the same pass and
/// recorded as the result's type.
///
/// # Panics
/// If `var_depth` is zero: no variable lives there.
pub fn subst_tm_ty(
    heap: &mut Heap,
    target_depth: Depth,
    var_depth: Depth,
    env: &SubstEnv,
    expected_type: Option<Addr>,
    expr: Addr,
) -> Addr {
    assert!(var_depth > 0, "subst_tm_ty: variables never live at depth 0");

    if target_depth == var_depth {
        let (term, ty) = match env.kind {
            VarKind::Term => (true, false),
            VarKind::Type => (false, true),
        };
        let untouched = |heap: &Heap, addr: Addr| !is_var_used(heap, var_depth, addr, term, ty);
        if untouched(heap, expr) && expected_type.is_none_or(|ty| untouched(heap, ty)) {
            trace!(%expr, var_depth, "subst_tm_ty: variable unused, sharing");
            if let Some(ty) = expected_type {
                heap.annotate(expr, ty);
            }
            return expr;
        }
    }

    let mut rewriter = Rewriter::new(SubstRule {
        target_depth,
        var_depth,
        env: *env,
    });
    let result = rewriter.rewrite(heap, expr);
    if let Some(ty) = expected_type {
        let ty = rewriter.rewrite(heap, ty);
        heap.annotate(result, ty);
    }
    trace!(%expr, %result, target_depth, var_depth, "subst_tm_ty");
    result
}
