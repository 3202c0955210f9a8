//! Shared utilities for kfix.
//!
//! This crate provides cross-cutting concerns used by all other kfix crates:
//! the unified error type, filesystem helpers (including forceful removal
//! with retries), hashing, process spawning, and terminal status output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;
pub mod progress;
