//! Derivation expressions.
//!
//! A derivation says how a node's verdict follows from other nodes' verdicts.
//! Evaluated subexpressions remember a decided value and the nodes it came
//! from, so re-evaluating a partly decided derivation only revisits the
//! parts that were still unknown.

use super::ternary::TiVal;
use crate::types::Addr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TiOp {
    Const(TiVal),
    Ref(Addr),
    And(Box<TiExpr>, Box<TiExpr>),
    /// Premise, consequence.
    AndImplicative(Box<TiExpr>, Box<TiExpr>),
    Or(Box<TiExpr>, Box<TiExpr>),
    /// Premise, consequence.
    OrImplicative(Box<TiExpr>, Box<TiExpr>),
    Not(Box<TiExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiExpr {
    pub op: TiOp,
    /// Set once the expression is decided; never holds an unknown.
    pub value: Option<TiVal>,
    pub causes: Vec<Addr>,
}

impl TiExpr {
    fn new(op: TiOp) -> Self {
        TiExpr {
            op,
            value: None,
            causes: Vec::new(),
        }
    }

    pub fn constant(value: TiVal) -> Self {
        TiExpr::new(TiOp::Const(value))
    }

    pub fn reference(node: Addr) -> Self {
        TiExpr::new(TiOp::Ref(node))
    }

    pub fn and(left: TiExpr, right: TiExpr) -> Self {
        TiExpr::new(TiOp::And(Box::new(left), Box::new(right)))
    }

    pub fn and_imp(premise: TiExpr, consequence: TiExpr) -> Self {
        TiExpr::new(TiOp::AndImplicative(Box::new(premise), Box::new(consequence)))
    }

    pub fn or(left: TiExpr, right: TiExpr) -> Self {
        TiExpr::new(TiOp::Or(Box::new(left), Box::new(right)))
    }

    pub fn or_imp(premise: TiExpr, consequence: TiExpr) -> Self {
        TiExpr::new(TiOp::OrImplicative(Box::new(premise), Box::new(consequence)))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: TiExpr) -> Self {
        TiExpr::new(TiOp::Not(Box::new(inner)))
    }

    /// The decided value, or unknown.
    #[inline]
    pub fn current(&self) -> TiVal {
        self.value.unwrap_or(TiVal::UNKNOWN)
    }

    /// Record an evaluation result; unknowns are not cached.
    pub(crate) fn settle(&mut self, value: TiVal, causes: Vec<Addr>) -> TiVal {
        if value.is_decided() {
            self.value = Some(value);
            self.causes = causes;
        }
        value
    }

    /// Every node this expression refers to, in order.
    pub fn references(&self) -> Vec<Addr> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match &expr.op {
                TiOp::Const(_) => {}
                TiOp::Ref(node) => out.push(*node),
                TiOp::And(a, b)
                | TiOp::AndImplicative(a, b)
                | TiOp::Or(a, b)
                | TiOp::OrImplicative(a, b) => {
                    stack.push(b);
                    stack.push(a);
                }
                TiOp::Not(inner) => stack.push(inner),
            }
        }
        out
    }
}
