//! Depth-invariant checker.
//!
//! Walks everything reachable from a root with an explicit worklist, each
//! node paired with the scope it was reached in, and collects every
//! violation instead of stopping at the first.

use crate::heap::Heap;
use crate::types::{Addr, Depth, NodeData};
use rustc_hash::FxHashSet;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// A node is deeper than the scope it was reached from allows.
    DepthExceedsScope {
        node: Addr,
        depth: Depth,
        scope: Depth,
    },
    /// A variable reached outside every binder.
    EscapedVariable { node: Addr },
    /// An indirection chain that does not resolve.
    UnresolvedIndirection { node: Addr },
    /// A reserved slot that was never filled.
    UnfilledSlot { node: Addr },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DepthExceedsScope { node, depth, scope } => {
                write!(f, "{node}: depth {depth} exceeds scope {scope}")
            }
            Violation::EscapedVariable { node } => write!(f, "{node}: escaped variable"),
            Violation::UnresolvedIndirection { node } => {
                write!(f, "{node}: unresolved indirection")
            }
            Violation::UnfilledSlot { node } => write!(f, "{node}: unfilled slot"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub visited: usize,
    pub violations: Vec<Violation>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "ok ({} nodes)", self.visited);
        }
        writeln!(
            f,
            "{} violation(s) in {} nodes:",
            self.violations.len(),
            self.visited
        )?;
        for violation in &self.violations {
            writeln!(f, "  {violation}")?;
        }
        Ok(())
    }
}

pub fn check(heap: &Heap, root: Addr) -> bool {
    check_report(heap, root).is_ok()
}

pub fn check_report(heap: &Heap, root: Addr) -> CheckReport {
    let mut report = CheckReport::default();
    let Ok(root_node) = heap.try_node(root) else {
        report.violations.push(Violation::UnresolvedIndirection { node: root });
        return report;
    };

    let mut visited: FxHashSet<(Addr, Depth)> = FxHashSet::default();
    let mut worklist = vec![(root, root_node.depth)];

    while let Some((addr, scope)) = worklist.pop() {
        if !visited.insert((addr, scope)) {
            continue;
        }
        report.visited += 1;
        let node = heap.node(addr);

        if node.depth > scope {
            report.violations.push(Violation::DepthExceedsScope {
                node: addr,
                depth: node.depth,
                scope,
            });
        }

        match node.data {
            NodeData::TmVar | NodeData::TyVar => {
                if scope == 0 || node.depth == 0 {
                    report.violations.push(Violation::EscapedVariable { node: addr });
                }
            }
            NodeData::Pending => report.violations.push(Violation::UnfilledSlot { node: addr }),
            NodeData::Indirection(_) => match heap.try_direct_addr_of(addr) {
                Ok(target) => worklist.push((target.addr(), scope)),
                Err(_) => report
                    .violations
                    .push(Violation::UnresolvedIndirection { node: addr }),
            },
            NodeData::TmLambda { .. }
            | NodeData::TyFun { .. }
            | NodeData::Primitive { .. }
            | NodeData::TmPair { .. }
            | NodeData::TmApp { .. }
            | NodeData::Literal(_)
            | NodeData::Opaque { .. } => {
                for (child, slot) in node.data.children() {
                    if heap.contains(child) {
                        worklist.push((child, slot.scope(node.depth)));
                    } else {
                        report
                            .violations
                            .push(Violation::UnresolvedIndirection { node: child });
                    }
                }
            }
        }
    }

    for violation in &report.violations {
        warn!(%violation, %root, "heap consistency violation");
    }
    report
}
