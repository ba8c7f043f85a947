//! Node representation for the term/type graph.
//!
//! Every term and type lives in the [`Heap`](crate::Heap) as a [`Node`]: a
//! depth tag plus a [`NodeData`] payload. Nodes refer to each other through
//! [`Addr`] handles, which are never invalidated or reused.
//!
//! # Depth
//!
//! A node's depth is the binder level of the scope it was built in. It is an
//! upper bound on the levels of the variables the node may mention, so:
//!
//! - a child in an ordinary slot has `depth(child) <= depth(parent)`
//! - a child in a binder slot (lambda pattern/body, `TyFun` codomain) has
//!   `depth(child) <= depth(parent) + 1`
//! - a variable at depth `k` refers to the binder whose own depth is `k - 1`,
//!   so no variable ever has depth 0
//!
//! Closed subgraphs built at depth 0 can therefore be shared under any number
//! of binders, and any node whose depth is below a variable's level provably
//! does not mention it.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use tg_common::Atom;

/// Binder nesting level.
pub type Depth = u32;

/// Inline capacity covers every structural primitive (`Self`, `Fix` and the
/// binary set operators).
pub type NodeList = SmallVec<[Addr; 2]>;

/// Opaque handle to a heap node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Addr(pub u32);

impl Addr {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An address known to denote a type.
///
/// Zero-cost refinement of [`Addr`]; produced by the heap's type constructors
/// and by the application engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeAddr(Addr);

impl TypeAddr {
    /// Assert that `addr` denotes a type. No check is performed.
    #[inline]
    pub const fn new_unchecked(addr: Addr) -> Self {
        TypeAddr(addr)
    }

    #[inline]
    pub const fn addr(self) -> Addr {
        self.0
    }
}

impl From<TypeAddr> for Addr {
    #[inline]
    fn from(ty: TypeAddr) -> Addr {
        ty.0
    }
}

/// An address whose node is not an indirection.
///
/// Only [`Heap::direct_addr_of`](crate::Heap::direct_addr_of) produces these.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DirectAddr(pub(crate) Addr);

impl DirectAddr {
    #[inline]
    pub const fn addr(self) -> Addr {
        self.0
    }
}

impl From<DirectAddr> for Addr {
    #[inline]
    fn from(direct: DirectAddr) -> Addr {
        direct.0
    }
}

/// Which kind of variable a binder introduces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VarKind {
    Term,
    Type,
}

/// Names of `Primitive` nodes.
///
/// The structural primitives are interpreted by the application engine and
/// the inhabitation solver; `Named` covers ordinary data constructors and
/// base types (`Int`, `Str`, ...).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Prim {
    /// `Self(λself. body)`: a function type that may refer to itself.
    SelfTy,
    /// `Fix(λrec. body)`: an ordinary recursive type.
    Fix,
    /// `{<:}(sub, sup)`
    Sub,
    /// `{:>}(sup, sub)`
    Super,
    /// `{|}(a, b)`
    Union,
    /// `{&}(a, b)`
    Intersection,
    Any,
    /// Unresolved placeholder. Allocated fresh; never structurally equal to
    /// another placeholder unless identity comparison is requested.
    Unknown,
    /// The universe. Its single argument is its own type (`Type : Type`).
    Type,
    Named(Atom),
}

impl Prim {
    /// Surface spelling of the structural primitives.
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            Prim::SelfTy => Some("Self"),
            Prim::Fix => Some("Fix"),
            Prim::Sub => Some("{<:}"),
            Prim::Super => Some("{:>}"),
            Prim::Union => Some("{|}"),
            Prim::Intersection => Some("{&}"),
            Prim::Any => Some("Any"),
            Prim::Unknown => Some("Unknown"),
            Prim::Type => Some("Type"),
            Prim::Named(_) => None,
        }
    }

    /// Number of arguments the primitive expects, when fixed.
    pub fn arity(self) -> Option<usize> {
        match self {
            Prim::SelfTy | Prim::Fix | Prim::Type => Some(1),
            Prim::Sub | Prim::Super | Prim::Union | Prim::Intersection => Some(2),
            Prim::Any | Prim::Unknown => Some(0),
            Prim::Named(_) => None,
        }
    }

    /// `{<:}`, `{:>}`, `{|}`: operators that application distributes over.
    pub fn is_distributive(self) -> bool {
        matches!(self, Prim::Sub | Prim::Super | Prim::Union)
    }
}

/// Literal term payloads.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    Int(i64),
    Str(Atom),
}

/// Scope of a child slot relative to its parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Same scope as the parent.
    Outer,
    /// Inside the parent's binder: one level deeper.
    Binder,
}

impl Slot {
    /// Scope available to a child in this slot of a parent at `parent_depth`.
    #[inline]
    pub fn scope(self, parent_depth: Depth) -> Depth {
        match self {
            Slot::Outer => parent_depth,
            Slot::Binder => parent_depth + 1,
        }
    }
}

/// Node payload. A closed set: every consumer matches it exhaustively.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeData {
    /// Term variable; the node's depth names its binder.
    TmVar,
    /// Type variable; the node's depth names its binder.
    TyVar,
    /// `λpattern. body`; pattern and body are one level deeper.
    TmLambda { pattern: Addr, body: Addr },
    /// `(x : domain) -> codomain`; the codomain is one level deeper and may
    /// mention the bound term variable `x`.
    TyFun { domain: Addr, codomain: Addr },
    Primitive { prim: Prim, args: NodeList },
    TmPair { first: Addr, second: Addr },
    TmApp { func: Addr, arg: Addr },
    Literal(Literal),
    /// Some term of type `ty`, about which nothing else is known.
    Opaque { ty: Addr },
    /// Reserved slot awaiting `Heap::fill`.
    Pending,
    /// Forwarding pointer installed when the node's value became known.
    Indirection(Addr),
}

impl NodeData {
    /// Short kind name for logs and fingerprints.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeData::TmVar => "TmVar",
            NodeData::TyVar => "TyVar",
            NodeData::TmLambda { .. } => "TmLambda",
            NodeData::TyFun { .. } => "TyFun",
            NodeData::Primitive { .. } => "Primitive",
            NodeData::TmPair { .. } => "TmPair",
            NodeData::TmApp { .. } => "TmApp",
            NodeData::Literal(_) => "Literal",
            NodeData::Opaque { .. } => "Opaque",
            NodeData::Pending => "Pending",
            NodeData::Indirection(_) => "Indirection",
        }
    }

    /// Variable kind, if this is a variable node.
    pub fn var_kind(&self) -> Option<VarKind> {
        match self {
            NodeData::TmVar => Some(VarKind::Term),
            NodeData::TyVar => Some(VarKind::Type),
            NodeData::TmLambda { .. }
            | NodeData::TyFun { .. }
            | NodeData::Primitive { .. }
            | NodeData::TmPair { .. }
            | NodeData::TmApp { .. }
            | NodeData::Literal(_)
            | NodeData::Opaque { .. }
            | NodeData::Pending
            | NodeData::Indirection(_) => None,
        }
    }

    /// Structural children with the scope of the slot they occupy.
    ///
    /// An indirection's target is reported as an `Outer` child.
    pub fn children(&self) -> SmallVec<[(Addr, Slot); 4]> {
        let mut out = SmallVec::new();
        match self {
            NodeData::TmVar | NodeData::TyVar | NodeData::Literal(_) | NodeData::Pending => {}
            NodeData::TmLambda { pattern, body } => {
                out.push((*pattern, Slot::Binder));
                out.push((*body, Slot::Binder));
            }
            NodeData::TyFun { domain, codomain } => {
                out.push((*domain, Slot::Outer));
                out.push((*codomain, Slot::Binder));
            }
            NodeData::Primitive { args, .. } => {
                out.extend(args.iter().map(|&arg| (arg, Slot::Outer)));
            }
            NodeData::TmPair { first, second } => {
                out.push((*first, Slot::Outer));
                out.push((*second, Slot::Outer));
            }
            NodeData::TmApp { func, arg } => {
                out.push((*func, Slot::Outer));
                out.push((*arg, Slot::Outer));
            }
            NodeData::Opaque { ty } => out.push((*ty, Slot::Outer)),
            NodeData::Indirection(target) => out.push((*target, Slot::Outer)),
        }
        out
    }

    /// Rebuild the payload with every child replaced by `f(child, slot)`.
    pub fn map_children(&self, mut f: impl FnMut(Addr, Slot) -> Addr) -> NodeData {
        match self {
            NodeData::TmVar => NodeData::TmVar,
            NodeData::TyVar => NodeData::TyVar,
            NodeData::Literal(lit) => NodeData::Literal(*lit),
            NodeData::Pending => NodeData::Pending,
            NodeData::TmLambda { pattern, body } => NodeData::TmLambda {
                pattern: f(*pattern, Slot::Binder),
                body: f(*body, Slot::Binder),
            },
            NodeData::TyFun { domain, codomain } => NodeData::TyFun {
                domain: f(*domain, Slot::Outer),
                codomain: f(*codomain, Slot::Binder),
            },
            NodeData::Primitive { prim, args } => NodeData::Primitive {
                prim: *prim,
                args: args.iter().map(|&arg| f(arg, Slot::Outer)).collect(),
            },
            NodeData::TmPair { first, second } => NodeData::TmPair {
                first: f(*first, Slot::Outer),
                second: f(*second, Slot::Outer),
            },
            NodeData::TmApp { func, arg } => NodeData::TmApp {
                func: f(*func, Slot::Outer),
                arg: f(*arg, Slot::Outer),
            },
            NodeData::Opaque { ty } => NodeData::Opaque {
                ty: f(*ty, Slot::Outer),
            },
            NodeData::Indirection(target) => NodeData::Indirection(f(*target, Slot::Outer)),
        }
    }

    /// The primitive and its arguments, if this is a `Primitive` node.
    #[inline]
    pub fn as_primitive(&self) -> Option<(Prim, &[Addr])> {
        match self {
            NodeData::Primitive { prim, args } => Some((*prim, args.as_slice())),
            _ => None,
        }
    }
}

/// A heap cell.
#[derive(Clone, Debug)]
pub struct Node {
    pub depth: Depth,
    pub data: NodeData,
}
