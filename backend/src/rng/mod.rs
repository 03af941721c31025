//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! CRITICAL: Every no-show draw and stay-length sample MUST go through this module,
//! otherwise rollback cannot reproduce the draws of a replayed day.

mod xorshift;

pub use xorshift::{RngCheckpoint, RngManager};
