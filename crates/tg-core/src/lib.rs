//! Term/type graph engine.
//!
//! Terms and types share one append-only, hash-consed [`Heap`]. On top of it:
//!
//! - [`predicates`]: alpha-equivalence, variable usage, dependency probes
//! - [`subst`]: capture-avoiding substitution with depth shifting
//! - [`application`]: type-level application (dependent, `Self`, `Fix`, set
//!   operators)
//! - [`inhabit`]: three-valued inhabitation solver with a persistable memo
//! - [`check`]: depth-invariant checker for diagnostics
//!
//! Scoping uses absolute depth tags instead of De Bruijn indices; see
//! [`types`] for the invariant.

pub mod application;
pub mod check;
pub mod error;
pub mod format;
pub mod heap;
pub mod inhabit;
pub mod predicates;
mod query_trace;
pub mod recursion;
mod rewrite;
pub mod subst;
pub mod types;
pub mod visitor;

pub use application::{ApplicationEvaluator, apply};
pub use check::{CheckReport, Violation, check, check_report};
pub use error::{Contradiction, HeapError, MemoError, TiError};
pub use format::NodeDisplay;
pub use heap::Heap;
pub use inhabit::{
    Derivation, InhabitSolver, MemoStats, TiExpr, TiMemo, TiMemoEntry, TiOp, TiVal,
    type_inhabited,
};
pub use predicates::{
    EqualityOptions, is_dependent_fun_ty, is_var_used, term_equal, ty_contains_unknown,
};
pub use rewrite::copy_without_indirections;
pub use subst::{SubstEnv, subst_tm_ty};
pub use types::{
    Addr, Depth, DirectAddr, Literal, Node, NodeData, NodeList, Prim, Slot, TypeAddr, VarKind,
};
pub use visitor::{NodeVisitor, node_guide, node_guide_data};

#[cfg(test)]
#[path = "../tests/heap_tests.rs"]
mod heap_tests;
#[cfg(test)]
#[path = "../tests/predicates_tests.rs"]
mod predicates_tests;
#[cfg(test)]
#[path = "../tests/subst_tests.rs"]
mod subst_tests;
#[cfg(test)]
#[path = "../tests/check_tests.rs"]
mod check_tests;
