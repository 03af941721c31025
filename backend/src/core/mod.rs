//! Core time-keeping for the simulation

pub mod clock;

pub use clock::{ClockMove, Direction, SimulationClock, FIRST_DAY};
