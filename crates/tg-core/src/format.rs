//! Human-readable rendering of nodes for logs and diagnostics.
//!
//! Output is bounded: subtrees past the format depth print as `…` and a node
//! re-entered on the current path prints as `<cycle #n>`.

use crate::heap::Heap;
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::types::{Addr, Depth, Literal, Prim};
use crate::visitor::{NodeVisitor, node_guide};
use std::fmt;

pub struct NodeDisplay<'a> {
    heap: &'a Heap,
    addr: Addr,
}

impl<'a> NodeDisplay<'a> {
    pub fn new(heap: &'a Heap, addr: Addr) -> Self {
        NodeDisplay { heap, addr }
    }
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.heap.contains(self.addr) {
            return write!(f, "<invalid {}>", self.addr);
        }
        let mut printer = Printer {
            heap: self.heap,
            f,
            guard: RecursionGuard::with_profile(RecursionProfile::Format),
        };
        printer.print(self.addr)
    }
}

struct Printer<'a, 'f, 'g> {
    heap: &'a Heap,
    f: &'f mut fmt::Formatter<'g>,
    guard: RecursionGuard<Addr>,
}

impl Printer<'_, '_, '_> {
    fn print(&mut self, addr: Addr) -> fmt::Result {
        let direct = match self.heap.try_direct_addr_of(addr) {
            Ok(direct) => direct.addr(),
            Err(_) => return write!(self.f, "<unresolved {addr}>"),
        };
        match self.guard.enter(direct) {
            RecursionResult::Entered => {}
            RecursionResult::Cycle => return write!(self.f, "<cycle {direct}>"),
            RecursionResult::DepthExceeded | RecursionResult::IterationExceeded => {
                return self.f.write_str("…");
            }
        }
        let heap = self.heap;
        let result = node_guide(heap, self, direct);
        self.guard.leave(direct);
        result
    }

    fn print_args(&mut self, args: &[Addr]) -> fmt::Result {
        self.f.write_str("(")?;
        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                self.f.write_str(", ")?;
            }
            self.print(arg)?;
        }
        self.f.write_str(")")
    }
}

impl NodeVisitor for Printer<'_, '_, '_> {
    type Output = fmt::Result;

    fn visit_tm_var(&mut self, _addr: Addr, depth: Depth) -> fmt::Result {
        write!(self.f, "x{depth}")
    }

    fn visit_ty_var(&mut self, _addr: Addr, depth: Depth) -> fmt::Result {
        write!(self.f, "T{depth}")
    }

    fn visit_tm_lambda(&mut self, _: Addr, _: Depth, pattern: Addr, body: Addr) -> fmt::Result {
        self.f.write_str("λ")?;
        self.print(pattern)?;
        self.f.write_str(". ")?;
        self.print(body)
    }

    fn visit_ty_fun(&mut self, _: Addr, depth: Depth, domain: Addr, codomain: Addr) -> fmt::Result {
        write!(self.f, "(x{} : ", depth + 1)?;
        self.print(domain)?;
        self.f.write_str(") -> ")?;
        self.print(codomain)
    }

    fn visit_primitive(&mut self, addr: Addr, _: Depth, prim: Prim, args: &[Addr]) -> fmt::Result {
        match prim {
            Prim::Named(atom) => {
                self.f.write_str(self.heap.name_of(atom))?;
                if args.is_empty() {
                    Ok(())
                } else {
                    self.print_args(args)
                }
            }
            Prim::Unknown => write!(self.f, "?{}", addr.0),
            Prim::Type => self.f.write_str("Type"),
            Prim::Any => self.f.write_str("Any"),
            Prim::SelfTy | Prim::Fix | Prim::Sub | Prim::Super | Prim::Union | Prim::Intersection => {
                self.f.write_str(prim.symbol().unwrap_or("?"))?;
                self.print_args(args)
            }
        }
    }

    fn visit_tm_pair(&mut self, _: Addr, _: Depth, first: Addr, second: Addr) -> fmt::Result {
        self.f.write_str("(")?;
        self.print(first)?;
        self.f.write_str(", ")?;
        self.print(second)?;
        self.f.write_str(")")
    }

    fn visit_tm_app(&mut self, _: Addr, _: Depth, func: Addr, arg: Addr) -> fmt::Result {
        self.print(func)?;
        self.f.write_str(" ")?;
        self.print(arg)
    }

    fn visit_literal(&mut self, _: Addr, _: Depth, literal: Literal) -> fmt::Result {
        match literal {
            Literal::Int(value) => write!(self.f, "{value}"),
            Literal::Str(atom) => write!(self.f, "{:?}", self.heap.name_of(atom)),
        }
    }

    fn visit_opaque(&mut self, _: Addr, _: Depth, ty: Addr) -> fmt::Result {
        self.f.write_str("<opaque : ")?;
        self.print(ty)?;
        self.f.write_str(">")
    }

    fn visit_pending(&mut self, addr: Addr, _: Depth) -> fmt::Result {
        write!(self.f, "<pending {addr}>")
    }

    fn visit_indirection(&mut self, _: Addr, _: Depth, target: Addr) -> fmt::Result {
        self.print(target)
    }
}
