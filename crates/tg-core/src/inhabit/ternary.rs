//! Three-valued inhabitation verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `[known uninhabited, known inhabited]`.
///
/// Neither flag set is unknown; exactly one set is decided; both set is a
/// contradiction. Contradictions are only ever produced by [`TiVal::and`] /
/// [`TiVal::or`] on inputs that already contradict, and are reported as
/// errors by the implicative operators instead of being returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TiVal {
    pub uninhabited: bool,
    pub inhabited: bool,
}

impl TiVal {
    pub const TRUE: TiVal = TiVal {
        uninhabited: false,
        inhabited: true,
    };
    pub const FALSE: TiVal = TiVal {
        uninhabited: true,
        inhabited: false,
    };
    pub const UNKNOWN: TiVal = TiVal {
        uninhabited: false,
        inhabited: false,
    };
    pub const CONTRADICTION: TiVal = TiVal {
        uninhabited: true,
        inhabited: true,
    };

    #[inline]
    pub fn is_true(self) -> bool {
        self == TiVal::TRUE
    }

    #[inline]
    pub fn is_false(self) -> bool {
        self == TiVal::FALSE
    }

    #[inline]
    pub fn is_decided(self) -> bool {
        self.uninhabited != self.inhabited
    }

    #[inline]
    pub fn is_contradiction(self) -> bool {
        self.uninhabited && self.inhabited
    }

    pub fn and(self, other: TiVal) -> TiVal {
        TiVal {
            uninhabited: self.uninhabited || other.uninhabited,
            inhabited: self.inhabited && other.inhabited,
        }
    }

    pub fn or(self, other: TiVal) -> TiVal {
        TiVal {
            uninhabited: self.uninhabited && other.uninhabited,
            inhabited: self.inhabited || other.inhabited,
        }
    }

    pub fn not(self) -> TiVal {
        TiVal {
            uninhabited: self.inhabited,
            inhabited: self.uninhabited,
        }
    }

    /// "If `premise` is inhabited then so is `consequence`", read as a
    /// conjunction. `None` when the premise is inhabited and the consequence
    /// is not.
    pub fn and_imp(premise: TiVal, consequence: TiVal) -> Option<TiVal> {
        if premise.inhabited && consequence.uninhabited {
            None
        } else if premise.inhabited {
            Some(TiVal::TRUE)
        } else if consequence.uninhabited {
            Some(TiVal::FALSE)
        } else {
            Some(premise.and(consequence))
        }
    }

    /// Disjunctive reading of the same implication; contradicts on the same
    /// inputs as [`TiVal::and_imp`].
    pub fn or_imp(premise: TiVal, consequence: TiVal) -> Option<TiVal> {
        if premise.inhabited && consequence.uninhabited {
            None
        } else if premise.inhabited {
            Some(TiVal::TRUE)
        } else if consequence.uninhabited {
            Some(TiVal::FALSE)
        } else {
            Some(premise.or(consequence))
        }
    }
}

impl fmt::Display for TiVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match (self.uninhabited, self.inhabited) {
            (false, false) => "unknown",
            (false, true) => "inhabited",
            (true, false) => "uninhabited",
            (true, true) => "contradiction",
        };
        f.write_str(text)
    }
}
