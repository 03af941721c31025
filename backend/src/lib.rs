//! Bed Occupancy Core - Rust Engine
//!
//! Deterministic, seed-reproducible day-by-day simulation of hospital bed
//! occupancy: patients wait in a queue, arrive or fail to show up on a
//! weighted draw, occupy beds for a drawn number of days and are released
//! when their stay ends. Days can be advanced, rolled back and reset, and a
//! voice agent can move queued patients forward with their consent.
//!
//! # Architecture
//!
//! - **core**: Simulation clock
//! - **models**: Domain types (Patient, Bed, Queue, HospitalState, series)
//! - **repository**: Queue & bed storage behind the `BedRepository` trait
//! - **orchestrator**: Config, checkpoints and the day-advance engine
//! - **stats**: Statistics aggregator
//! - **agent**: Voice-agent collaborator
//! - **scenario**: Starting hospitals, loaded or generated
//! - **service**: Request boundary with explicit response types
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All randomness is deterministic (seeded RNG, checkpointed per day)
//! 2. A bed holds at most one patient; queue positions are always `1..=len`
//! 3. FFI boundary is minimal and safe

// Module declarations
pub mod agent;
pub mod core;
pub mod models;
pub mod orchestrator;
pub mod repository;
pub mod rng;
pub mod scenario;
pub mod service;
pub mod stats;

// Re-exports for convenience
pub use agent::{AgentError, NegotiationRequest, VoiceAgent};
pub use core::{Direction, SimulationClock};
pub use models::{
    event::{Event, EventLog},
    state::HospitalState,
};
pub use orchestrator::{SimulationConfig, SimulationEngine, SimulationError, Tables};
pub use repository::{BedRepository, InMemoryRepository};
pub use rng::{RngCheckpoint, RngManager};
pub use scenario::{GeneratorConfig, Scenario};
pub use service::SimulationService;
pub use stats::StatisticsBlock;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn bed_occupancy_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::simulation::PyHospitalSimulation>()?;
    Ok(())
}
