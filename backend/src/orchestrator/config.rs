//! Simulation configuration
//!
//! Every field has a default, so `{}` is a valid configuration describing
//! the simple model: seed 43, twenty days, a 4:1 arrive/no-show draw,
//! stays of one to seven days and release at zero remaining days.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::orchestrator::SimulationError;

/// Default RNG seed
pub const DEFAULT_SEED: u64 = 43;

/// Default last simulated day
pub const DEFAULT_MAX_DAY: u32 = 20;

/// Weights of the per-patient arrival draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoShowWeights {
    /// Weight of "patient arrives"
    pub arrive: u32,
    /// Weight of "patient does not show up"
    pub no_show: u32,
}

impl Default for NoShowWeights {
    fn default() -> Self {
        Self {
            arrive: 4,
            no_show: 1,
        }
    }
}

/// Inclusive range of drawn stay lengths, in days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub min: i32,
    pub max: i32,
}

impl Default for StayRange {
    fn default() -> Self {
        Self { min: 1, max: 7 }
    }
}

/// Which queue entries are eligible for the daily no-show draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// The head of the queue, as many entries as beds were released
    #[default]
    ReleasedSlots,
    /// Every entry booked for the day or earlier
    AdmissionDay,
}

/// How free beds are pooled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedPoolMode {
    /// One pool of all free beds
    #[default]
    Shared,
    /// One pool per department; patients only get beds of their
    /// procedure's department
    ByDepartment,
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed used at construction and on every reset
    pub rng_seed: u64,

    /// Last day the clock may reach
    pub max_day: u32,

    pub no_show_weights: NoShowWeights,

    pub stay_length: StayRange,

    /// Assignments whose remaining stay drops to this value or below are
    /// released
    pub release_threshold: i32,

    pub admission_mode: AdmissionMode,

    pub bed_pools: BedPoolMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rng_seed: DEFAULT_SEED,
            max_day: DEFAULT_MAX_DAY,
            no_show_weights: NoShowWeights::default(),
            stay_length: StayRange::default(),
            release_threshold: 0,
            admission_mode: AdmissionMode::default(),
            bed_pools: BedPoolMode::default(),
        }
    }
}

impl SimulationConfig {
    /// The extended model: bookings per admission day, department pools
    /// and release one day earlier
    pub fn extended() -> Self {
        Self {
            release_threshold: 1,
            admission_mode: AdmissionMode::AdmissionDay,
            bed_pools: BedPoolMode::ByDepartment,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.max_day < 1 {
            return Err(SimulationError::InvalidConfig(
                "max_day must be at least 1".to_string(),
            ));
        }
        if self.no_show_weights.arrive == 0 || self.no_show_weights.no_show == 0 {
            return Err(SimulationError::InvalidConfig(format!(
                "no-show weights must be positive, got {}:{}",
                self.no_show_weights.arrive, self.no_show_weights.no_show
            )));
        }
        if self.stay_length.min < 1 || self.stay_length.min > self.stay_length.max {
            return Err(SimulationError::InvalidConfig(format!(
                "stay length range {}..={} is invalid",
                self.stay_length.min, self.stay_length.max
            )));
        }
        if self.release_threshold < 0 {
            return Err(SimulationError::InvalidConfig(format!(
                "release_threshold must not be negative, got {}",
                self.release_threshold
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, SimulationError> {
        let config: SimulationConfig = serde_json::from_str(json)
            .map_err(|e| SimulationError::InvalidConfig(format!("Config parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SimulationError::InvalidConfig(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }
}
