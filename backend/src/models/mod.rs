//! Domain models for the bed occupancy simulator

pub mod bed;
pub mod consent;
pub mod event;
pub mod patient;
pub mod queue;
pub mod series;
pub mod state;

// Re-exports
pub use bed::{Bed, BedAssignment, BedId};
pub use consent::ConsentRegistry;
pub use event::{AdmissionSource, Event, EventLog};
pub use patient::{Department, Doctor, DoctorId, MedicalProcedure, Patient, PatientId, ProcedureId};
pub use queue::{NewQueueEntry, PatientQueue, QueueEntry, QueueEntryId};
pub use series::{MetricValue, Sentinel, TimeSeries};
pub use state::HospitalState;
