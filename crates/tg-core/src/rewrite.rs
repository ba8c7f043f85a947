//! Cycle-safe graph rewriting.
//!
//! Copying and substitution are both "rebuild every reachable node, maybe
//! replacing some of them" walks. [`Rewriter`] owns the parts they share:
//!
//! - a `done` map, so a node shared by several parents is rebuilt once;
//! - a [`RecursionGuard`] on-path set, so a genuine cycle is noticed instead
//!   of followed forever;
//! - reserved slots that close such cycles in the output: the first time a
//!   node is re-entered from below, the walk hands out a `Pending` slot for
//!   it, and the slot is filled when the node itself finishes.
//!
//! Nodes are always walked through their resolved form, so the output never
//! contains an indirection. A node whose rebuilt payload and depth are
//! unchanged is shared rather than reallocated.

use crate::heap::Heap;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::{Addr, Depth, Node};
use rustc_hash::FxHashMap;
use tg_common::limits::{MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE};

/// Per-walk behaviour plugged into a [`Rewriter`].
pub(crate) trait RewriteRule {
    /// Replace a resolved node wholesale, without visiting its children.
    fn shortcut(&mut self, heap: &mut Heap, addr: Addr, node: &Node) -> Option<Addr>;

    /// Depth of the rebuilt form of a node at `depth`.
    fn rebuilt_depth(&self, depth: Depth) -> Depth;
}

pub(crate) struct Rewriter<R> {
    rule: R,
    done: FxHashMap<Addr, Addr>,
    guard: RecursionGuard<Addr>,
    cycle_slots: FxHashMap<Addr, Addr>,
}

impl<R: RewriteRule> Rewriter<R> {
    pub(crate) fn new(rule: R) -> Self {
        Rewriter {
            rule,
            done: FxHashMap::default(),
            guard: RecursionGuard::with_profile(RecursionProfile::Rewrite),
            cycle_slots: FxHashMap::default(),
        }
    }

    pub(crate) fn rewrite(&mut self, heap: &mut Heap, addr: Addr) -> Addr {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
            self.rewrite_inner(heap, addr)
        })
    }

    fn rewrite_inner(&mut self, heap: &mut Heap, addr: Addr) -> Addr {
        let direct = heap.direct_addr_of(addr).addr();
        if let Some(&out) = self.done.get(&direct) {
            return out;
        }

        let node = heap.node(direct).clone();
        if let Some(out) = self.rule.shortcut(heap, direct, &node) {
            self.done.insert(direct, out);
            return out;
        }

        match self.guard.enter(direct) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => {
                let depth = self.rule.rebuilt_depth(node.depth);
                return *self
                    .cycle_slots
                    .entry(direct)
                    .or_insert_with(|| heap.reserve(depth));
            }
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                panic!("rewrite of {direct} exceeded the rewrite depth budget")
            }
        }

        let depth = self.rule.rebuilt_depth(node.depth);
        let mut changed = depth != node.depth;
        let data = node.data.map_children(|child, _| {
            let out = self.rewrite(heap, child);
            changed |= out != child;
            out
        });

        let out = match self.cycle_slots.remove(&direct) {
            Some(slot) => {
                heap.fill_unchecked(slot, data);
                slot
            }
            None if !changed => direct,
            None => heap.allocate(depth, data),
        };

        self.guard.leave(direct);
        self.done.insert(direct, out);
        out
    }
}

struct CopyRule {
    type_root: Addr,
}

impl RewriteRule for CopyRule {
    fn shortcut(&mut self, _heap: &mut Heap, addr: Addr, _node: &Node) -> Option<Addr> {
        (addr == self.type_root).then_some(addr)
    }

    fn rebuilt_depth(&self, depth: Depth) -> Depth {
        depth
    }
}

/// A structurally equivalent graph with no indirection reachable from the
/// result. Subgraphs that already contain none are shared, not duplicated.
pub fn copy_without_indirections(heap: &mut Heap, addr: Addr) -> Addr {
    let type_root = heap.type_root().addr();
    let mut rewriter = Rewriter::new(CopyRule { type_root });
    rewriter.rewrite(heap, addr)
}
