//! Beds and bed assignments
//!
//! A bed holds at most one assignment at a time. The assignment is destroyed
//! (the patient is released) once its remaining stay reaches the configured
//! release threshold.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::patient::{Department, PatientId, ProcedureId};

/// Stable bed identifier. Bed pools are always consumed in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BedId(pub u32);

impl fmt::Display for BedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical bed, optionally tied to a department
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    #[serde(default)]
    pub department: Option<Department>,
}

/// Links a bed to the patient currently occupying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedAssignment {
    pub bed_id: BedId,
    pub patient_id: PatientId,
    #[serde(default)]
    pub procedure: Option<ProcedureId>,
    /// Remaining days of stay; decremented once per simulated day
    pub days_of_stay: i32,
}

impl BedAssignment {
    pub fn new(bed_id: BedId, patient_id: PatientId, procedure: Option<ProcedureId>, days_of_stay: i32) -> Self {
        Self {
            bed_id,
            patient_id,
            procedure,
            days_of_stay,
        }
    }

    /// Whether this assignment should be released at `threshold`
    pub fn is_due(&self, threshold: i32) -> bool {
        self.days_of_stay <= threshold
    }
}
