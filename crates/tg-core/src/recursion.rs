//! Recursion guards for graph walks.
//!
//! The graph is a DAG almost everywhere, but the canonical `Type : Type` root
//! and reserved-slot fills create genuine cycles. Every recursive walk in the
//! engine therefore needs two separate things:
//!
//! 1. an **on-current-path** set, to notice a genuine cycle; and
//! 2. a **depth/iteration budget**, to stop runaway unrolling.
//!
//! A global "already done" memo is a third, distinct concern that each walk
//! keeps for itself: a shared node legitimately reached from several paths is
//! not a cycle.
//!
//! [`RecursionGuard`] provides (1) and (2); [`DepthCounter`] provides only the
//! depth budget, for walks where re-entering the same key is legal (e.g.
//! re-applying a `Fix` body to the same argument).
//!
//! # Profiles
//!
//! [`RecursionProfile`] names the budgets so call sites read as intent:
//!
//! ```ignore
//! let guard = RecursionGuard::with_profile(RecursionProfile::Inhabitation);
//! ```

use rustc_hash::FxHashSet;
use std::hash::Hash;
use tg_common::limits;

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Nested application steps inside one `apply` call.
    Application,
    /// Derivation evaluation in the inhabitation solver.
    Inhabitation,
    /// Dependent-function-type probe through wrappers.
    DependencyProbe,
    /// Copy and substitution rewrites (stack grows via `stacker`).
    Rewrite,
    /// Diagnostic rendering.
    Format,
    /// Caller-chosen limits (e.g. the `term_equal` stack limit).
    Custom { max_depth: u32, max_iterations: u32 },
}

impl RecursionProfile {
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::Application => limits::MAX_APPLICATION_DEPTH,
            Self::Inhabitation => limits::MAX_INHABITATION_DEPTH,
            Self::DependencyProbe => limits::MAX_DEPENDENCY_PROBE_DEPTH,
            Self::Rewrite => limits::MAX_REWRITE_DEPTH,
            Self::Format => limits::MAX_FORMAT_DEPTH,
            Self::Custom { max_depth, .. } => max_depth,
        }
    }

    pub const fn max_iterations(self) -> u32 {
        match self {
            Self::Custom { max_iterations, .. } => max_iterations,
            // A rewrite enters each node once; its memo bounds the work.
            Self::Rewrite => u32::MAX,
            Self::Application
            | Self::Inhabitation
            | Self::DependencyProbe
            | Self::Format => limits::MAX_SOLVER_ITERATIONS,
        }
    }
}

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    Entered,
    /// The key is on the current path: a genuine cycle.
    Cycle,
    DepthExceeded,
    IterationExceeded,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered)
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        matches!(self, Self::Cycle)
    }

    #[inline]
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::IterationExceeded)
    }
}

/// On-path set plus depth and iteration budgets.
///
/// Every successful [`enter`](Self::enter) must be paired with a
/// [`leave`](Self::leave) of the same key. Debug builds panic on a leave
/// without a matching enter and on dropping a guard with keys still on the
/// path.
pub struct RecursionGuard<K: Hash + Eq + Copy> {
    on_path: FxHashSet<K>,
    depth: u32,
    iterations: u32,
    max_depth: u32,
    max_iterations: u32,
    exceeded: bool,
}

impl<K: Hash + Eq + Copy> RecursionGuard<K> {
    pub fn new(max_depth: u32, max_iterations: u32) -> Self {
        Self {
            on_path: FxHashSet::default(),
            depth: 0,
            iterations: 0,
            max_depth,
            max_iterations,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth(), profile.max_iterations())
    }

    /// Try to enter `key`. Cycles are reported before budgets are charged
    /// against depth, but every attempt counts as an iteration.
    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.iterations = self.iterations.saturating_add(1);

        if self.iterations > self.max_iterations {
            self.exceeded = true;
            return RecursionResult::IterationExceeded;
        }
        if self.on_path.contains(&key) {
            return RecursionResult::Cycle;
        }
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }

        self.on_path.insert(key);
        self.depth += 1;
        RecursionResult::Entered
    }

    pub fn leave(&mut self, key: K) {
        let was_present = self.on_path.remove(&key);
        debug_assert!(
            was_present,
            "RecursionGuard::leave() called for a key that is not on the current path"
        );
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn is_on_path(&self, key: &K) -> bool {
        self.on_path.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Sticky: stays set after the depth drops back below the limit.
    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq + Copy> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.on_path.is_empty() {
            panic!(
                "RecursionGuard dropped with {} keys still on the current path",
                self.on_path.len(),
            );
        }
    }
}

/// Depth-only budget; no cycle detection.
pub struct DepthCounter {
    depth: u32,
    max_depth: u32,
    exceeded: bool,
}

impl DepthCounter {
    pub fn new(max_depth: u32) -> Self {
        Self {
            depth: 0,
            max_depth,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth())
    }

    /// Returns `false` (and enters nothing) when the budget is spent.
    #[must_use]
    pub fn enter(&mut self) -> bool {
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return false;
        }
        self.depth += 1;
        true
    }

    pub fn leave(&mut self) {
        debug_assert!(self.depth > 0, "DepthCounter::leave() at depth 0");
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }
}

#[cfg(debug_assertions)]
impl Drop for DepthCounter {
    fn drop(&mut self) {
        if !std::thread::panicking() && self.depth > 0 {
            panic!("DepthCounter dropped at depth {}", self.depth);
        }
    }
}
