//! Name interner for constructor names and string literals.
//!
//! Names appear in `Primitive` nodes and string literals. Interning them into
//! `u32` atoms keeps `NodeData` `Copy`-friendly and hashable, which the heap's
//! hash-consing table depends on, and turns name comparison into integer
//! comparison.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An interned name.
///
/// Atoms are cheap to copy (just a u32) and can be compared with == in O(1).
/// To get the actual string, use `NameInterner::resolve(atom)`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord,
)]
pub struct Atom(pub u32);

impl Atom {
    /// A sentinel value representing no atom / empty string.
    pub const NONE: Atom = Atom(0);

    /// Check if this is the empty/none atom.
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Get the raw index value.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Constructor names every front-end uses; pre-interned so their atoms are
/// stable across heaps built in the same order.
const COMMON_NAMES: &[&str] = &["Int", "Str", "Bool", "Nat", "Unit", "List", "Pair", "True", "False"];

/// Single-threaded name interner.
///
/// # Example
/// ```
/// use tg_common::interner::NameInterner;
/// let mut names = NameInterner::new();
/// let a1 = names.intern("Int");
/// let a2 = names.intern("Int");
/// assert_eq!(a1, a2);
/// assert_eq!(names.resolve(a1), "Int");
/// ```
#[derive(Default)]
pub struct NameInterner {
    map: FxHashMap<Arc<str>, Atom>,
    /// Index 0 is the empty string.
    strings: Vec<Arc<str>>,
}

impl NameInterner {
    /// Create a new interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let mut interner = NameInterner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(64),
        };
        let empty: Arc<str> = Arc::from("");
        interner.strings.push(empty.clone());
        interner.map.insert(empty, Atom::NONE);
        for name in COMMON_NAMES {
            interner.intern(name);
        }
        interner
    }

    /// Intern a name, returning its Atom handle.
    #[inline]
    pub fn intern(&mut self, s: &str) -> Atom {
        if let Some(&atom) = self.map.get(s) {
            return atom;
        }
        let atom = Atom(self.strings.len() as u32);
        let owned: Arc<str> = Arc::from(s);
        self.strings.push(owned.clone());
        self.map.insert(owned, atom);
        atom
    }

    /// Look up a name without interning it.
    #[inline]
    pub fn get(&self, s: &str) -> Option<Atom> {
        self.map.get(s).copied()
    }

    /// Resolve an Atom back to its string value.
    /// Returns empty string if atom is out of bounds.
    #[inline]
    pub fn resolve(&self, atom: Atom) -> &str {
        self.strings
            .get(atom.0 as usize)
            .map(|s| s.as_ref())
            .unwrap_or("")
    }

    /// Number of interned names, including the empty string.
    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }
}
