//! Centralized limits and thresholds for the typegraph engine.
//!
//! Every budget that bounds work in the engine lives here so it can be tuned
//! in one place. Guards inside `tg-core` refer to these through
//! `RecursionProfile` presets rather than repeating the numbers.
//!
//! # Categories
//!
//! - **Recursion Depths**: Limits to prevent stack overflow in recursive algorithms
//! - **Operation Counts**: Limits to prevent runaway iteration
//! - **Stack Growth**: `stacker` red zone / segment size for deep rewrites

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Default recursion budget for structural equality.
///
/// When exhausted, `term_equal` returns `None` ("inconclusive"), never `false`.
pub const DEFAULT_TERM_EQUAL_STACK_LIMIT: u32 = 1000;

/// Maximum nesting of application steps (`Self` re-wrapping, `Fix`
/// unrolling, union/bound distribution) within one `apply` call.
///
/// A `Fix` whose body unrolls to another `Fix` without exposing structure
/// would otherwise recurse forever; hitting the limit makes the application
/// stuck instead.
pub const MAX_APPLICATION_DEPTH: u32 = 64;

/// Maximum nesting of derivation evaluation in the inhabitation solver.
pub const MAX_INHABITATION_DEPTH: u32 = 256;

/// Maximum depth for the dependent-function-type probe.
pub const MAX_DEPENDENCY_PROBE_DEPTH: u32 = 128;

/// Maximum depth of a graph rewrite (copy or substitution).
///
/// Rewrites grow the stack through `stacker`, so this is a runaway bound,
/// not a stack-safety bound.
pub const MAX_REWRITE_DEPTH: u32 = 100_000;

/// Maximum depth rendered by the diagnostic node formatter before eliding.
pub const MAX_FORMAT_DEPTH: u32 = 12;

// =============================================================================
// Operation Count Limits
// =============================================================================

/// Upper bound on the steps taken while resolving an indirection chain.
///
/// Chains are compressed on every resolution and installation refuses to
/// create cycles, so exceeding this means the heap is corrupt.
pub const MAX_INDIRECTION_CHAIN: u32 = 1_000_000;

/// Iteration budget shared by the solver's recursion guards.
pub const MAX_SOLVER_ITERATIONS: u32 = 1_000_000;

// =============================================================================
// Stack Growth
// =============================================================================

/// Remaining stack below which deep recursions allocate a new segment.
pub const MIN_STACK_RED_ZONE: usize = 32 * 1024;

/// Size of each stack segment allocated by `stacker::maybe_grow`.
pub const STACK_GROWTH_SIZE: usize = 1024 * 1024;
