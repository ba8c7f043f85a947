//! Structural predicates over the graph.
//!
//! All predicates look through indirections and never allocate.

use crate::heap::Heap;
use crate::query_trace;
use crate::recursion::{DepthCounter, RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::{Addr, Depth, NodeData, Prim, Slot};
use rustc_hash::{FxHashMap, FxHashSet};
use tg_common::limits::{
    DEFAULT_TERM_EQUAL_STACK_LIMIT, MAX_SOLVER_ITERATIONS, MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE,
};

// =============================================================================
// Structural equality
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualityOptions {
    /// Compare `Unknown` holes by identity. Off by default: two holes, or a
    /// hole and itself, are never equal, so distinct unresolved holes are
    /// never unified by accident.
    pub unknown_equals_unknown: bool,
    /// Recursion budget; exhausting it makes the answer `None`.
    pub stack_limit: u32,
}

impl Default for EqualityOptions {
    fn default() -> Self {
        EqualityOptions {
            unknown_equals_unknown: false,
            stack_limit: DEFAULT_TERM_EQUAL_STACK_LIMIT,
        }
    }
}

/// Alpha-equivalence of the resolved forms of `a` and `b`.
///
/// Returns `None` when the recursion budget runs out. Genuine cycles are
/// compared coinductively.
pub fn term_equal(heap: &Heap, a: Addr, b: Addr, options: EqualityOptions) -> Option<bool> {
    let query = query_trace::binary_start("term_equal", a, b);
    let mut checker = EqualityChecker::new(heap, options);
    let result = checker.equal(a, b);
    query_trace::end(query, "term_equal", &result, false);
    result
}

struct EqualityChecker<'a> {
    heap: &'a Heap,
    options: EqualityOptions,
    guard: RecursionGuard<(Addr, Addr)>,
    /// Corresponding binder levels, innermost last.
    binders: Vec<(Depth, Depth)>,
    unknown_cache: FxHashMap<Addr, bool>,
    /// Pairs shown equal while every binder pair was aligned. Under aligned
    /// binders variable levels compare by value, so these hold in any other
    /// aligned context.
    proven: FxHashSet<(Addr, Addr)>,
}

impl<'a> EqualityChecker<'a> {
    fn new(heap: &'a Heap, options: EqualityOptions) -> Self {
        EqualityChecker {
            heap,
            options,
            guard: RecursionGuard::with_profile(RecursionProfile::Custom {
                max_depth: options.stack_limit,
                max_iterations: MAX_SOLVER_ITERATIONS,
            }),
            binders: Vec::new(),
            unknown_cache: FxHashMap::default(),
            proven: FxHashSet::default(),
        }
    }

    fn equal(&mut self, a: Addr, b: Addr) -> Option<bool> {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || self.equal_inner(a, b))
    }

    fn equal_inner(&mut self, a: Addr, b: Addr) -> Option<bool> {
        let a = self.heap.direct_addr_of(a).addr();
        let b = self.heap.direct_addr_of(b).addr();
        let heap = self.heap;
        let (na, nb) = (heap.node(a), heap.node(b));

        let a_unknown = matches!(na.data.as_primitive(), Some((Prim::Unknown, _)));
        let b_unknown = matches!(nb.data.as_primitive(), Some((Prim::Unknown, _)));
        if a_unknown || b_unknown {
            return Some(self.options.unknown_equals_unknown && a == b);
        }

        if a == b && self.aligned_below(na.depth) && !self.reaches_unknown(a) {
            return Some(true);
        }

        let aligned = self.binders.iter().all(|&(la, lb)| la == lb);
        if aligned && self.proven.contains(&(a, b)) {
            return Some(true);
        }

        match self.guard.enter((a, b)) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return Some(true),
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => return None,
        }
        let result = self.compare_nodes(a, b);
        self.guard.leave((a, b));
        if aligned && result == Some(true) {
            self.proven.insert((a, b));
        }
        result
    }

    fn compare_nodes(&mut self, a: Addr, b: Addr) -> Option<bool> {
        let heap = self.heap;
        let (na, nb) = (heap.node(a), heap.node(b));

        let same_head = match (&na.data, &nb.data) {
            (NodeData::TmVar, NodeData::TmVar) | (NodeData::TyVar, NodeData::TyVar) => {
                return Some(self.var_equal(na.depth, nb.depth));
            }
            (NodeData::Pending, NodeData::Pending) => return Some(a == b),
            (NodeData::Literal(x), NodeData::Literal(y)) => return Some(x == y),
            (
                NodeData::Primitive { prim: pa, args: xa },
                NodeData::Primitive { prim: pb, args: xb },
            ) => pa == pb && xa.len() == xb.len(),
            (NodeData::TmLambda { .. }, NodeData::TmLambda { .. })
            | (NodeData::TyFun { .. }, NodeData::TyFun { .. })
            | (NodeData::TmPair { .. }, NodeData::TmPair { .. })
            | (NodeData::TmApp { .. }, NodeData::TmApp { .. })
            | (NodeData::Opaque { .. }, NodeData::Opaque { .. }) => true,
            (NodeData::Indirection(_), _) | (_, NodeData::Indirection(_)) => {
                unreachable!("resolved nodes are never indirections")
            }
            _ => false,
        };
        if !same_head {
            return Some(false);
        }

        let children_a = na.data.children();
        let children_b = nb.data.children();
        let mut inconclusive = false;
        for (&(ca, slot), &(cb, _)) in children_a.iter().zip(children_b.iter()) {
            let pushed = slot == Slot::Binder;
            if pushed {
                self.binders.push((na.depth + 1, nb.depth + 1));
            }
            let result = self.equal(ca, cb);
            if pushed {
                self.binders.pop();
            }
            match result {
                Some(true) => {}
                Some(false) => return Some(false),
                None => inconclusive = true,
            }
        }
        if inconclusive { None } else { Some(true) }
    }

    /// Levels `ka` and `kb` denote the same variable when the innermost binder
    /// mentioning either level binds both, or when neither is bound inside the
    /// comparison and the levels coincide.
    fn var_equal(&self, ka: Depth, kb: Depth) -> bool {
        for &(la, lb) in self.binders.iter().rev() {
            if la == ka || lb == kb {
                return la == ka && lb == kb;
            }
        }
        ka == kb
    }

    /// A node compared against itself may be taken as equal only if every
    /// level it can mention means the same on both sides.
    fn aligned_below(&self, depth: Depth) -> bool {
        self.binders
            .iter()
            .all(|&(la, lb)| la == lb || la.min(lb) > depth)
    }

    fn reaches_unknown(&mut self, addr: Addr) -> bool {
        if self.options.unknown_equals_unknown {
            return false;
        }
        if let Some(&cached) = self.unknown_cache.get(&addr) {
            return cached;
        }
        let found = ty_contains_unknown(self.heap, addr);
        self.unknown_cache.insert(addr, found);
        found
    }
}

// =============================================================================
// Variable usage
// =============================================================================

/// Whether a variable at exactly `var_depth` occurs in `node`.
///
/// Nodes whose depth is below `var_depth` cannot mention it and are skipped
/// without traversal.
pub fn is_var_used(
    heap: &Heap,
    var_depth: Depth,
    node: Addr,
    check_term_vars: bool,
    check_type_vars: bool,
) -> bool {
    let mut visited = FxHashSet::default();
    let mut worklist = vec![node];

    while let Some(addr) = worklist.pop() {
        let direct = heap.direct_addr_of(addr).addr();
        if !visited.insert(direct) {
            continue;
        }
        let current = heap.node(direct);
        if current.depth < var_depth {
            continue;
        }
        match current.data {
            NodeData::TmVar => {
                if check_term_vars && current.depth == var_depth {
                    return true;
                }
            }
            NodeData::TyVar => {
                if check_type_vars && current.depth == var_depth {
                    return true;
                }
            }
            _ => worklist.extend(current.data.children().into_iter().map(|(child, _)| child)),
        }
    }
    false
}

// =============================================================================
// Dependent function types
// =============================================================================

/// Whether `ty` is a function type whose codomain mentions its argument.
///
/// Wrappers (`Self`, `Fix`, bounds, unions, intersections) are looked
/// through; a wrapper is dependent if either side is, independent if both
/// sides are, and unknown otherwise. Variables and holes are unknown.
pub fn is_dependent_fun_ty(heap: &Heap, ty: Addr) -> Option<bool> {
    let query = query_trace::unary_start("is_dependent_fun_ty", ty);
    let mut counter = DepthCounter::with_profile(RecursionProfile::DependencyProbe);
    let result = dependent_probe(heap, &mut counter, ty);
    query_trace::end(query, "is_dependent_fun_ty", &result, false);
    result
}

fn dependent_probe(heap: &Heap, counter: &mut DepthCounter, ty: Addr) -> Option<bool> {
    if !counter.enter() {
        return None;
    }
    let node = heap.direct_node(ty);
    let result = match &node.data {
        NodeData::TyFun { codomain, .. } => {
            Some(is_var_used(heap, node.depth + 1, *codomain, true, false))
        }
        NodeData::Primitive { prim, args } => match prim {
            Prim::SelfTy | Prim::Fix => match args.first().map(|&lam| heap.direct_node(lam)) {
                Some(lam) => match lam.data {
                    NodeData::TmLambda { body, .. } => dependent_probe(heap, counter, body),
                    _ => None,
                },
                None => None,
            },
            Prim::Sub | Prim::Super | Prim::Union | Prim::Intersection => {
                match (args.first(), args.get(1)) {
                    (Some(&a), Some(&b)) => {
                        let left = dependent_probe(heap, counter, a);
                        if left == Some(true) {
                            Some(true)
                        } else {
                            let right = dependent_probe(heap, counter, b);
                            match (left, right) {
                                (_, Some(true)) => Some(true),
                                (Some(false), Some(false)) => Some(false),
                                _ => None,
                            }
                        }
                    }
                    _ => None,
                }
            }
            Prim::Any | Prim::Type | Prim::Named(_) => Some(false),
            Prim::Unknown => None,
        },
        NodeData::TmLambda { .. }
        | NodeData::TmPair { .. }
        | NodeData::TmApp { .. }
        | NodeData::Literal(_) => Some(false),
        NodeData::TmVar | NodeData::TyVar | NodeData::Opaque { .. } | NodeData::Pending => None,
        NodeData::Indirection(_) => unreachable!("resolved nodes are never indirections"),
    };
    counter.leave();
    result
}

// =============================================================================
// Unknown holes
// =============================================================================

/// Whether an `Unknown` hole is reachable from `ty`.
pub fn ty_contains_unknown(heap: &Heap, ty: Addr) -> bool {
    let mut visited = FxHashSet::default();
    let mut worklist = vec![ty];

    while let Some(addr) = worklist.pop() {
        let direct = heap.direct_addr_of(addr).addr();
        if !visited.insert(direct) {
            continue;
        }
        let data = &heap.node(direct).data;
        if let Some((Prim::Unknown, _)) = data.as_primitive() {
            return true;
        }
        worklist.extend(data.children().into_iter().map(|(child, _)| child));
    }
    false
}
