//! Simulation error types

use thiserror::Error;

use crate::agent::AgentError;
use crate::repository::RepositoryError;

/// Errors surfaced by the engine and the service boundary
///
/// - `InvalidInput`: rejected before any state is touched
/// - `NoCapacity`: domain refusal, safe to retry after a day advances
/// - `TransactionFailure`: a materialization pass failed and was rolled back
/// - `ConsistencyViolation`: an engine bug, never caused by user input
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("No capacity: {0}")]
    NoCapacity(String),

    #[error("Materialization of day {day} failed: {source}")]
    TransactionFailure {
        day: u32,
        #[source]
        source: Box<SimulationError>,
    },

    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Voice agent error: {0}")]
    Agent(#[from] AgentError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl SimulationError {
    /// Whether the same request may succeed later without any fix
    pub fn is_retryable(&self) -> bool {
        matches!(self, SimulationError::NoCapacity(_))
    }

    /// Whether the error points at an engine bug
    pub fn is_fatal(&self) -> bool {
        match self {
            SimulationError::ConsistencyViolation(_) => true,
            SimulationError::TransactionFailure { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    pub(crate) fn transaction_failure(day: u32, source: SimulationError) -> Self {
        SimulationError::TransactionFailure {
            day,
            source: Box::new(source),
        }
    }
}
