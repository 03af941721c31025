//! Orchestrator - clock, checkpoints and the day-advance engine
//!
//! See `engine.rs` for the transition algorithm.

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod tables;

pub use checkpoint::{
    compute_config_hash, validate_snapshot, validate_state, CheckpointStore, DayCheckpoint,
    NoShowRecord, SimulationSnapshot,
};
pub use config::{AdmissionMode, BedPoolMode, NoShowWeights, SimulationConfig, StayRange};
pub use engine::{Interrupt, MaterializeOutcome, SimulationEngine};
pub use error::SimulationError;
pub use tables::{BedRow, CallCandidate, CallOutcome, QueueRow, Tables};
