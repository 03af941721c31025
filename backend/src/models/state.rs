//! Hospital State
//!
//! Represents the complete persisted state the engine reads and mutates:
//! beds, patients, procedures, doctors, active bed assignments and the
//! waiting queue.
//!
//! # Critical Invariants
//!
//! 1. **Bed Exclusivity**: at most one assignment per bed (assignments are
//!    keyed by bed id, and inserting into an occupied bed is rejected)
//! 2. **Single Admission**: a patient occupies at most one bed
//! 3. **Queue Packing**: queue positions are `1..=len` with no gaps
//! 4. **No Dangling References**: every assignment and queue entry refers to
//!    an existing bed, patient and procedure

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::bed::{Bed, BedAssignment, BedId};
use crate::models::patient::{Doctor, DoctorId, MedicalProcedure, Patient, PatientId, ProcedureId};
use crate::models::queue::PatientQueue;
use crate::repository::RepositoryError;

/// Complete hospital state
///
/// # Example
///
/// ```rust
/// use bed_occupancy_core::models::{Bed, BedId, HospitalState};
///
/// let beds = vec![
///     Bed { id: BedId(1), department: None },
///     Bed { id: BedId(2), department: None },
/// ];
/// let state = HospitalState::new(beds, vec![], vec![], vec![]);
/// assert_eq!(state.total_beds(), 2);
/// assert_eq!(state.occupied_beds(), 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HospitalState {
    beds: BTreeMap<BedId, Bed>,
    patients: BTreeMap<PatientId, Patient>,
    procedures: BTreeMap<ProcedureId, MedicalProcedure>,
    doctors: BTreeMap<DoctorId, Doctor>,
    /// Active assignments, keyed by the bed they occupy
    assignments: BTreeMap<BedId, BedAssignment>,
    queue: PatientQueue,
}

impl HospitalState {
    pub fn new(
        beds: Vec<Bed>,
        patients: Vec<Patient>,
        procedures: Vec<MedicalProcedure>,
        doctors: Vec<Doctor>,
    ) -> Self {
        Self {
            beds: beds.into_iter().map(|b| (b.id, b)).collect(),
            patients: patients.into_iter().map(|p| (p.id, p)).collect(),
            procedures: procedures.into_iter().map(|p| (p.id, p)).collect(),
            doctors: doctors.into_iter().map(|d| (d.id, d)).collect(),
            assignments: BTreeMap::new(),
            queue: PatientQueue::new(),
        }
    }

    pub fn bed(&self, id: BedId) -> Option<&Bed> {
        self.beds.get(&id)
    }

    /// Beds in ascending id order
    pub fn beds(&self) -> impl Iterator<Item = &Bed> {
        self.beds.values()
    }

    pub fn patient(&self, id: PatientId) -> Option<&Patient> {
        self.patients.get(&id)
    }

    pub fn procedure(&self, id: ProcedureId) -> Option<&MedicalProcedure> {
        self.procedures.get(&id)
    }

    pub fn doctor(&self, id: DoctorId) -> Option<&Doctor> {
        self.doctors.get(&id)
    }

    pub fn assignment(&self, bed: BedId) -> Option<&BedAssignment> {
        self.assignments.get(&bed)
    }

    /// Active assignments in ascending bed order
    pub fn assignments(&self) -> impl Iterator<Item = &BedAssignment> {
        self.assignments.values()
    }

    pub(crate) fn assignments_mut(&mut self) -> impl Iterator<Item = &mut BedAssignment> {
        self.assignments.values_mut()
    }

    pub fn queue(&self) -> &PatientQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut PatientQueue {
        &mut self.queue
    }

    pub fn total_beds(&self) -> usize {
        self.beds.len()
    }

    pub fn occupied_beds(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_admitted(&self, patient: PatientId) -> bool {
        self.assignments.values().any(|a| a.patient_id == patient)
    }

    /// Place a patient into a free bed
    pub fn assign(&mut self, assignment: BedAssignment) -> Result<(), RepositoryError> {
        if !self.beds.contains_key(&assignment.bed_id) {
            return Err(RepositoryError::BedNotFound(assignment.bed_id));
        }
        if !self.patients.contains_key(&assignment.patient_id) {
            return Err(RepositoryError::PatientNotFound(assignment.patient_id));
        }
        if self.assignments.contains_key(&assignment.bed_id) {
            return Err(RepositoryError::BedOccupied(assignment.bed_id));
        }
        if self.is_admitted(assignment.patient_id) {
            return Err(RepositoryError::PatientAlreadyAdmitted(assignment.patient_id));
        }
        self.assignments.insert(assignment.bed_id, assignment);
        Ok(())
    }

    /// Remove every assignment whose stay is at or below `threshold`
    pub(crate) fn release_due(&mut self, threshold: i32) -> Vec<BedAssignment> {
        let due: Vec<BedId> = self
            .assignments
            .values()
            .filter(|a| a.is_due(threshold))
            .map(|a| a.bed_id)
            .collect();
        due.into_iter()
            .filter_map(|bed| self.assignments.remove(&bed))
            .collect()
    }

    /// Check every invariant listed in the module docs
    pub fn validate(&self) -> Result<(), String> {
        self.queue.check_packed()?;

        let mut admitted = BTreeSet::new();
        for (bed_id, assignment) in &self.assignments {
            if *bed_id != assignment.bed_id {
                return Err(format!(
                    "assignment stored under bed {} points at bed {}",
                    bed_id, assignment.bed_id
                ));
            }
            if !self.beds.contains_key(bed_id) {
                return Err(format!("assignment references unknown bed {}", bed_id));
            }
            if !self.patients.contains_key(&assignment.patient_id) {
                return Err(format!(
                    "bed {} references unknown patient {}",
                    bed_id, assignment.patient_id
                ));
            }
            if !admitted.insert(assignment.patient_id) {
                return Err(format!(
                    "patient {} occupies more than one bed",
                    assignment.patient_id
                ));
            }
        }

        for entry in self.queue.entries() {
            if !self.patients.contains_key(&entry.patient_id) {
                return Err(format!(
                    "queue entry {} references unknown patient {}",
                    entry.id, entry.patient_id
                ));
            }
            if let Some(procedure) = entry.procedure {
                if !self.procedures.contains_key(&procedure) {
                    return Err(format!(
                        "queue entry {} references unknown procedure {}",
                        entry.id, procedure.0
                    ));
                }
            }
        }

        for procedure in self.procedures.values() {
            if let Some(doctor) = procedure.doctor {
                if !self.doctors.contains_key(&doctor) {
                    return Err(format!(
                        "procedure {} references unknown doctor {}",
                        procedure.id.0, doctor.0
                    ));
                }
            }
        }

        Ok(())
    }
}
