//! Error types for the graph engine.
//!
//! Only genuine defects and I/O are errors here. A stuck application or an
//! inconclusive comparison is an ordinary `None`, not an error.

use crate::types::Addr;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapError {
    #[error("address {addr} does not belong to this heap")]
    UnknownAddr { addr: Addr },

    #[error("indirection chain from {addr} did not resolve within {steps} steps")]
    UnresolvedIndirection { addr: Addr, steps: u32 },

    #[error("{addr} already forwards to {existing}; refusing to redirect it to {requested}")]
    IndirectionConflict {
        addr: Addr,
        existing: Addr,
        requested: Addr,
    },

    #[error("{addr} cannot forward to itself")]
    SelfIndirection { addr: Addr },

    #[error("{addr} is not a reserved slot")]
    NotPending { addr: Addr },
}

/// A `TiVal` that is both known-inhabited and known-uninhabited.
///
/// Always an internal defect: a buggy derivation rule or an unsound unchecked
/// cast. Never reported as a user type error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contradiction {
    /// Node whose derivation produced the contradiction.
    pub node: Addr,
    /// Name of the derivation rule being evaluated.
    pub rule: String,
    /// Nodes whose decided values fed the contradicting step.
    pub causes: Vec<Addr>,
}

impl fmt::Display for Contradiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inhabitation contradiction at {} (rule `{}`)",
            self.node, self.rule
        )?;
        if !self.causes.is_empty() {
            write!(f, "; caused by")?;
            for cause in &self.causes {
                write!(f, " {cause}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TiError {
    #[error("{0}")]
    Contradiction(Contradiction),
}

#[derive(Debug, Error)]
pub enum MemoError {
    #[error("memo cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("memo cache is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("memo cache lists node {node} more than once")]
    DuplicateNode { node: Addr },
}
