//! Common types and utilities for the typegraph engine.
//!
//! This crate provides foundational types used across all typegraph crates:
//! - Name interning (`Atom`, `NameInterner`) for primitive and constructor names
//! - Engine limits and thresholds

// Name interning for constructor / primitive names and string literals
pub mod interner;
pub use interner::{Atom, NameInterner};

// Centralized limits and thresholds
pub mod limits;
