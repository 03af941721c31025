//! Queue & bed repository adapter
//!
//! The engine never touches persisted entities directly; it goes through
//! [`BedRepository`]. Every materialization pass runs inside one repository
//! transaction so that a failure part-way through a pass can be fully undone.
//!
//! Storage without native nested transactions can implement them the way
//! [`InMemoryRepository`] does: a stack of savepoint snapshots.

mod memory;

pub use memory::InMemoryRepository;

use thiserror::Error;

use crate::models::{
    Bed, BedAssignment, BedId, Department, Doctor, DoctorId, MedicalProcedure, Patient, PatientId,
    ProcedureId, QueueEntry, QueueEntryId,
};

/// Errors raised by repository operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Bed not found: {0}")]
    BedNotFound(BedId),

    #[error("Patient not found: {0}")]
    PatientNotFound(PatientId),

    #[error("Queue entry not found: {0}")]
    QueueEntryNotFound(QueueEntryId),

    #[error("Bed {0} already has an active assignment")]
    BedOccupied(BedId),

    #[error("Patient {0} already occupies a bed")]
    PatientAlreadyAdmitted(PatientId),

    #[error("No open transaction")]
    NoTransaction,
}

/// Contract the day-advance engine relies on
///
/// Ordering guarantees:
/// - [`list_free_beds`](Self::list_free_beds) returns beds by ascending id
/// - [`list_queue`](Self::list_queue) returns entries by ascending position
/// - [`delete_queue_entry`](Self::delete_queue_entry) re-packs positions
pub trait BedRepository {
    /// Opaque full-state snapshot used for day checkpoints
    type Snapshot: Clone;

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// All beds by ascending id
    fn beds(&self) -> Vec<Bed>;

    fn total_beds(&self) -> usize;

    /// Active assignments by ascending bed id
    fn assignments(&self) -> Vec<BedAssignment>;

    fn patient(&self, id: PatientId) -> Option<Patient>;

    fn procedure(&self, id: ProcedureId) -> Option<MedicalProcedure>;

    fn doctor(&self, id: DoctorId) -> Option<Doctor>;

    /// Free beds by ascending id; `None` lists every free bed,
    /// `Some(department)` only that department's
    fn list_free_beds(&self, department: Option<&Department>) -> Vec<BedId>;

    /// Queue by ascending position; `Some(day)` keeps only entries booked
    /// for that day or earlier
    fn list_queue(&self, admission_day: Option<u32>) -> Vec<QueueEntry>;

    fn queue_entry(&self, id: QueueEntryId) -> Option<QueueEntry>;

    /// Assignments whose remaining stay is at or below `threshold`
    fn list_assignments_at_or_below(&self, threshold: i32) -> Vec<BedAssignment>;

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Decrement every active assignment's remaining stay by one day
    fn decrement_stays(&mut self);

    /// Delete every assignment at or below `threshold`; returns the count
    fn delete_assignments_at_or_below(&mut self, threshold: i32) -> usize;

    /// Remove a queue entry and re-pack the positions behind it
    fn delete_queue_entry(&mut self, id: QueueEntryId) -> Result<QueueEntry, RepositoryError>;

    /// Occupy a free bed
    fn create_assignment(&mut self, assignment: BedAssignment) -> Result<(), RepositoryError>;

    // ------------------------------------------------------------------
    // Transactions and snapshots
    // ------------------------------------------------------------------

    /// Open a nested transaction (savepoint)
    fn begin(&mut self);

    /// Keep the changes made since the matching `begin`
    fn commit(&mut self) -> Result<(), RepositoryError>;

    /// Undo the changes made since the matching `begin`
    fn rollback(&mut self) -> Result<(), RepositoryError>;

    fn in_transaction(&self) -> bool;

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: Self::Snapshot);

    /// Check storage-level invariants (queue packing, bed exclusivity)
    fn validate(&self) -> Result<(), String>;
}
