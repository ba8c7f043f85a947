//! Type inhabitation in three-valued logic.

pub mod expr;
pub mod memo;
pub mod solver;
pub mod ternary;

pub use expr::{TiExpr, TiOp};
pub use memo::{Derivation, MemoStats, TiMemo, TiMemoEntry};
pub use solver::{InhabitSolver, type_inhabited};
pub use ternary::TiVal;
