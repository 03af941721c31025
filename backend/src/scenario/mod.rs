//! Scenarios: the hospital a simulation starts from
//!
//! A [`Scenario`] is a plain serde document (departments come from the
//! procedures and beds that reference them). It can be loaded from JSON or
//! generated deterministically from a seed.

mod generator;

pub use generator::GeneratorConfig;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::{Bed, BedAssignment, Doctor, HospitalState, MedicalProcedure, NewQueueEntry, Patient};
use crate::orchestrator::SimulationError;

/// Starting contents of the hospital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub procedures: Vec<MedicalProcedure>,
    pub beds: Vec<Bed>,
    pub patients: Vec<Patient>,
    /// Queue in order; the first entry gets position 1
    #[serde(default)]
    pub queue: Vec<NewQueueEntry>,
    /// Patients already in a bed on day 1
    #[serde(default)]
    pub assignments: Vec<BedAssignment>,
}

impl Scenario {
    pub fn from_json_str(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json)
            .map_err(|e| SimulationError::InvalidConfig(format!("Scenario parse failed: {}", e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimulationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SimulationError::InvalidConfig(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            SimulationError::SerializationError(format!("Scenario serialization failed: {}", e))
        })
    }

    /// Build and validate the hospital state
    pub fn into_state(self) -> Result<HospitalState, SimulationError> {
        let mut state = HospitalState::new(self.beds, self.patients, self.procedures, self.doctors);
        for entry in self.queue {
            state.queue_mut().push(entry);
        }
        for assignment in self.assignments {
            state
                .assign(assignment)
                .map_err(|e| SimulationError::InvalidConfig(format!("Bad initial assignment: {}", e)))?;
        }
        state.validate().map_err(SimulationError::InvalidConfig)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"{
        "beds": [{"id": 1, "department": "Cardiology"}, {"id": 2}],
        "patients": [
            {"id": 1, "first_name": "Anna", "last_name": "Nowak", "pesel": "90010112345", "sickness": "arrhythmia"},
            {"id": 2, "first_name": "Piotr", "last_name": "Wiśniewski", "pesel": "85050554321", "sickness": "fracture"}
        ],
        "queue": [{"patient_id": 2}],
        "assignments": [{"bed_id": 1, "patient_id": 1, "procedure": null, "days_of_stay": 3}]
    }"#;

    #[test]
    fn test_load_small_scenario() {
        let state = Scenario::from_json_str(SMALL).unwrap().into_state().unwrap();
        assert_eq!(state.total_beds(), 2);
        assert_eq!(state.occupied_beds(), 1);
        assert_eq!(state.queue().len(), 1);
        assert_eq!(state.queue().entries()[0].position, 1);
    }

    #[test]
    fn test_unknown_patient_in_assignment_is_rejected() {
        let json = SMALL.replace(r#""patient_id": 1, "procedure""#, r#""patient_id": 9, "procedure""#);
        let err = Scenario::from_json_str(&json).unwrap().into_state().unwrap_err();
        assert!(matches!(err, SimulationError::InvalidConfig(_)));
    }
}
