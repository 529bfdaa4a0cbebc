//! # Repositories
//!
//! One repository per table. Repositories are thin: single-statement reads
//! and writes against the pool. Anything that needs a multi-statement
//! transaction (reserve, commit, apply_delta) lives in the engine
//! components, which own their transaction boundaries.

pub mod movement;
pub mod product;
pub mod reservation;
