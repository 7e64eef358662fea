//! Data repairs applied after indexing.
//!
//! # Responsibility
//! - Replay missing-statement files into their target database.
//! - Consolidate the withdrawals table into the blocks database.
//!
//! # Invariants
//! - Each repair commits once, as a whole, or leaves its target unchanged.

pub mod inject;
pub mod withdrawals;
