//! Checkpoint - per-day saved state and snapshot export
//!
//! One [`DayCheckpoint`] is kept for every materialized day. It holds the
//! repository contents and the RNG state right after that day's transition,
//! so rolling back to a day is a restore and re-entering the next day
//! re-draws exactly the same values.
//!
//! # Critical Invariants
//!
//! - **Contiguity**: checkpoints cover days `1..=len` with no gaps
//! - **RNG timing**: the RNG state stored for day `d` is the state after all
//!   draws of day `d`'s transition
//! - **Config Matching**: a snapshot can only be imported with the config it
//!   was exported with

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::Direction;
use crate::models::{ConsentRegistry, EventLog, HospitalState, PatientId, QueueEntryId, TimeSeries};
use crate::orchestrator::{SimulationConfig, SimulationError};
use crate::rng::RngCheckpoint;

// ============================================================================
// Day Checkpoints
// ============================================================================

/// Patient who did not show up for admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoShowRecord {
    pub entry_id: QueueEntryId,
    pub patient_id: PatientId,
    pub patient_name: String,
}

/// Saved state right after one day's transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCheckpoint<S> {
    pub day: u32,
    pub rng: RngCheckpoint,
    pub state: S,
    /// No-shows recorded by the transition into this day
    pub no_shows: Vec<NoShowRecord>,
}

/// Stack of day checkpoints over a baseline
///
/// The baseline is the repository content the simulation started from;
/// day 1 is derived from it (plus any consents registered on day 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointStore<S> {
    baseline: S,
    days: Vec<DayCheckpoint<S>>,
}

impl<S: Clone> CheckpointStore<S> {
    pub fn new(baseline: S) -> Self {
        Self {
            baseline,
            days: Vec::new(),
        }
    }

    pub fn baseline(&self) -> &S {
        &self.baseline
    }

    /// Append the checkpoint of the next day
    pub fn push(&mut self, checkpoint: DayCheckpoint<S>) -> Result<(), SimulationError> {
        let expected = self.last_day() + 1;
        if checkpoint.day != expected {
            return Err(SimulationError::ConsistencyViolation(format!(
                "checkpoint for day {} pushed, expected day {}",
                checkpoint.day, expected
            )));
        }
        self.days.push(checkpoint);
        Ok(())
    }

    pub fn latest(&self) -> Option<&DayCheckpoint<S>> {
        self.days.last()
    }

    /// Swap the latest checkpoint for an amended one of the same day
    pub fn replace_latest(&mut self, checkpoint: DayCheckpoint<S>) -> Result<(), SimulationError> {
        let last = self.last_day();
        match self.days.last_mut() {
            Some(latest) if latest.day == checkpoint.day => {
                *latest = checkpoint;
                Ok(())
            }
            _ => Err(SimulationError::ConsistencyViolation(format!(
                "checkpoint for day {} cannot replace day {}",
                checkpoint.day, last
            ))),
        }
    }

    pub fn get(&self, day: u32) -> Option<&DayCheckpoint<S>> {
        day.checked_sub(1).and_then(|i| self.days.get(i as usize))
    }

    /// Last materialized day, 0 when nothing is materialized
    pub fn last_day(&self) -> u32 {
        self.days.len() as u32
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Drop every checkpoint after `day`
    pub fn prune_after(&mut self, day: u32) {
        self.days.truncate(day as usize);
    }

    /// Forget every checkpoint, keeping the baseline
    pub fn reset(&mut self) {
        self.days.clear();
    }

    pub fn days(&self) -> &[DayCheckpoint<S>] {
        &self.days
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute a deterministic SHA-256 hash of a configuration
///
/// Object keys are sorted recursively before hashing, so two configs with
/// the same content always hash the same.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Check queue packing, bed exclusivity and references of a state
pub fn validate_state(state: &HospitalState) -> Result<(), SimulationError> {
    state.validate().map_err(SimulationError::ConsistencyViolation)
}

// ============================================================================
// Snapshot Export
// ============================================================================

/// Complete engine state, for save/resume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub config: SimulationConfig,

    /// SHA-256 of `config` at export time
    pub config_hash: String,

    pub current_day: u32,

    pub last_direction: Direction,

    pub checkpoints: CheckpointStore<HospitalState>,

    pub occupancy: TimeSeries,

    pub average_stay: TimeSeries,

    pub no_shows: TimeSeries,

    pub consents: ConsentRegistry,

    pub events: EventLog,
}

impl SimulationSnapshot {
    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            SimulationError::SerializationError(format!("Snapshot serialization failed: {}", e))
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json).map_err(|e| {
            SimulationError::SerializationError(format!("Snapshot parse failed: {}", e))
        })
    }
}

/// Validate snapshot integrity against the config it is imported with
pub fn validate_snapshot(
    snapshot: &SimulationSnapshot,
    config: &SimulationConfig,
) -> Result<(), SimulationError> {
    let expected = compute_config_hash(config)?;
    if snapshot.config_hash != expected {
        return Err(SimulationError::InvalidConfig(format!(
            "Snapshot was exported with config {}, not {}",
            snapshot.config_hash, expected
        )));
    }

    let materialized = snapshot.checkpoints.len();
    if materialized == 0 {
        return Err(SimulationError::ConsistencyViolation(
            "snapshot has no materialized day".to_string(),
        ));
    }
    for (series, name) in [
        (&snapshot.occupancy, "occupancy"),
        (&snapshot.average_stay, "average stay"),
        (&snapshot.no_shows, "no-show"),
    ] {
        if series.len() != materialized {
            return Err(SimulationError::ConsistencyViolation(format!(
                "{} series has {} values for {} checkpoints",
                name,
                series.len(),
                materialized
            )));
        }
    }
    if snapshot.current_day < 1 || snapshot.current_day > config.max_day {
        return Err(SimulationError::InvalidInput(format!(
            "Snapshot day {} outside 1..={}",
            snapshot.current_day, config.max_day
        )));
    }
    if snapshot.checkpoints.last_day() > snapshot.current_day {
        return Err(SimulationError::ConsistencyViolation(format!(
            "snapshot has checkpoints up to day {} but is on day {}",
            snapshot.checkpoints.last_day(),
            snapshot.current_day
        )));
    }

    validate_state(snapshot.checkpoints.baseline())?;
    for (i, checkpoint) in snapshot.checkpoints.days().iter().enumerate() {
        if checkpoint.day as usize != i + 1 {
            return Err(SimulationError::ConsistencyViolation(format!(
                "checkpoint {} is labelled day {}",
                i + 1,
                checkpoint.day
            )));
        }
        validate_state(&checkpoint.state)?;
    }
    Ok(())
}
