//! xorshift64* random number generator
//!
//! # Algorithm
//!
//! xorshift64* is a variant of xorshift that passes TestU01's BigCrush
//! statistical tests. It uses 64-bit state and produces 64-bit output.
//!
//! # Determinism
//!
//! Same seed → same sequence of draws. The engine checkpoints the state after
//! every simulated day so that a rolled-back day is re-drawn identically.

use serde::{Deserialize, Serialize};

/// Opaque, restorable position of an [`RngManager`] stream.
///
/// Recorded per day by the checkpoint store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RngCheckpoint(u64);

impl RngCheckpoint {
    /// Raw 64-bit state (for display and export)
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use bed_occupancy_core::RngManager;
///
/// let mut rng = RngManager::new(43);
/// let stay = rng.range_inclusive(1, 7);
/// assert!((1..=7).contains(&stay));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit, never zero)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is mapped to 1 (xorshift requirement).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate random value in range [min, max)
    ///
    /// # Panics
    /// Panics if min >= max
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");

        let value = self.next();
        let range_size = (max - min) as u64;
        min + (value % range_size) as i64
    }

    /// Generate random value in range [min, max]
    ///
    /// # Panics
    /// Panics if min > max
    pub fn range_inclusive(&mut self, min: i64, max: i64) -> i64 {
        assert!(min <= max, "min must not exceed max");
        self.range(min, max + 1)
    }

    /// Weighted boolean draw.
    ///
    /// Behaves like picking uniformly from a list of `true_weight` trues
    /// followed by `false_weight` falses, so `weighted_bool(4, 1)` is true
    /// four times out of five. Consumes exactly one draw.
    ///
    /// # Panics
    /// Panics if both weights are zero
    pub fn weighted_bool(&mut self, true_weight: u32, false_weight: u32) -> bool {
        let total = true_weight as i64 + false_weight as i64;
        assert!(total > 0, "weights must not both be zero");
        self.range(0, total) < true_weight as i64
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Get current RNG state
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Capture the current stream position
    pub fn checkpoint(&self) -> RngCheckpoint {
        RngCheckpoint(self.state)
    }

    /// Rewind (or fast-forward) the stream to a captured position
    pub fn restore(&mut self, checkpoint: RngCheckpoint) {
        self.state = checkpoint.0;
    }

    /// Recreate a generator positioned at `checkpoint`
    pub fn from_checkpoint(checkpoint: RngCheckpoint) -> Self {
        Self::new(checkpoint.0)
    }

    /// Derive an independent stream from a seed and a list of salts.
    ///
    /// Used for side draws (call suggestions) that must never advance the
    /// checkpointed simulation stream.
    pub fn derived(seed: u64, salts: &[u64]) -> Self {
        let mut mixed = seed;
        for salt in salts {
            mixed ^= salt.wrapping_add(0x9E37_79B9_7F4A_7C15).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            mixed = mixed.rotate_left(31);
        }
        Self::new(mixed)
    }
}
