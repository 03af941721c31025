//! In-memory repository over [`HospitalState`]

use crate::models::{
    Bed, BedAssignment, BedId, Department, Doctor, DoctorId, HospitalState, MedicalProcedure,
    Patient, PatientId, ProcedureId, QueueEntry, QueueEntryId,
};
use crate::repository::{BedRepository, RepositoryError};

/// Repository keeping the whole hospital in memory
///
/// Nested transactions are savepoints: `begin` pushes a copy of the state,
/// `rollback` pops and restores it, `commit` pops and discards it.
///
/// # Example
///
/// ```rust
/// use bed_occupancy_core::models::{Bed, BedId, HospitalState};
/// use bed_occupancy_core::repository::{BedRepository, InMemoryRepository};
///
/// let state = HospitalState::new(vec![Bed { id: BedId(1), department: None }], vec![], vec![], vec![]);
/// let mut repo = InMemoryRepository::new(state);
///
/// repo.begin();
/// repo.decrement_stays();
/// repo.rollback().unwrap();
/// assert!(!repo.in_transaction());
/// ```
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    state: HospitalState,
    savepoints: Vec<HospitalState>,
}

impl InMemoryRepository {
    pub fn new(state: HospitalState) -> Self {
        Self {
            state,
            savepoints: Vec::new(),
        }
    }

    pub fn state(&self) -> &HospitalState {
        &self.state
    }

    /// Direct mutable access, bypassing transactions (test setup only)
    pub fn state_mut(&mut self) -> &mut HospitalState {
        &mut self.state
    }
}

impl BedRepository for InMemoryRepository {
    type Snapshot = HospitalState;

    fn beds(&self) -> Vec<Bed> {
        self.state.beds().cloned().collect()
    }

    fn total_beds(&self) -> usize {
        self.state.total_beds()
    }

    fn assignments(&self) -> Vec<BedAssignment> {
        self.state.assignments().cloned().collect()
    }

    fn patient(&self, id: PatientId) -> Option<Patient> {
        self.state.patient(id).cloned()
    }

    fn procedure(&self, id: ProcedureId) -> Option<MedicalProcedure> {
        self.state.procedure(id).cloned()
    }

    fn doctor(&self, id: DoctorId) -> Option<Doctor> {
        self.state.doctor(id).cloned()
    }

    fn list_free_beds(&self, department: Option<&Department>) -> Vec<BedId> {
        self.state
            .beds()
            .filter(|bed| self.state.assignment(bed.id).is_none())
            .filter(|bed| match department {
                None => true,
                Some(department) => bed.department.as_ref() == Some(department),
            })
            .map(|bed| bed.id)
            .collect()
    }

    fn list_queue(&self, admission_day: Option<u32>) -> Vec<QueueEntry> {
        self.state
            .queue()
            .entries()
            .iter()
            .filter(|entry| match admission_day {
                None => true,
                Some(day) => entry.requested_admission_day.map_or(false, |d| d <= day),
            })
            .cloned()
            .collect()
    }

    fn queue_entry(&self, id: QueueEntryId) -> Option<QueueEntry> {
        self.state.queue().get(id).cloned()
    }

    fn list_assignments_at_or_below(&self, threshold: i32) -> Vec<BedAssignment> {
        self.state
            .assignments()
            .filter(|a| a.is_due(threshold))
            .cloned()
            .collect()
    }

    fn decrement_stays(&mut self) {
        for assignment in self.state.assignments_mut() {
            assignment.days_of_stay -= 1;
        }
    }

    fn delete_assignments_at_or_below(&mut self, threshold: i32) -> usize {
        self.state.release_due(threshold).len()
    }

    fn delete_queue_entry(&mut self, id: QueueEntryId) -> Result<QueueEntry, RepositoryError> {
        self.state
            .queue_mut()
            .remove(id)
            .ok_or(RepositoryError::QueueEntryNotFound(id))
    }

    fn create_assignment(&mut self, assignment: BedAssignment) -> Result<(), RepositoryError> {
        self.state.assign(assignment)
    }

    fn begin(&mut self) {
        self.savepoints.push(self.state.clone());
    }

    fn commit(&mut self) -> Result<(), RepositoryError> {
        self.savepoints
            .pop()
            .map(|_| ())
            .ok_or(RepositoryError::NoTransaction)
    }

    fn rollback(&mut self) -> Result<(), RepositoryError> {
        let savepoint = self.savepoints.pop().ok_or(RepositoryError::NoTransaction)?;
        self.state = savepoint;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        !self.savepoints.is_empty()
    }

    fn snapshot(&self) -> HospitalState {
        self.state.clone()
    }

    fn restore(&mut self, snapshot: HospitalState) {
        self.state = snapshot;
    }

    fn validate(&self) -> Result<(), String> {
        self.state.validate()
    }
}
