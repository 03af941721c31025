//! Event logging for simulation auditing and replay checks.
//!
//! Every significant state change produced by a day transition (or by a
//! control operation) is recorded as an [`Event`]. Events are attributed to
//! the simulated day they belong to, so rolling back to day `d` simply drops
//! every event after `d`.
//!
//! # Example
//!
//! ```rust
//! use bed_occupancy_core::models::{BedId, Event, EventLog, PatientId};
//!
//! let mut log = EventLog::new();
//! log.log(Event::PatientReleased {
//!     day: 3,
//!     bed_id: BedId(1),
//!     patient_id: PatientId(7),
//! });
//! assert_eq!(log.events_on_day(3).len(), 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::models::bed::BedId;
use crate::models::patient::PatientId;
use crate::models::queue::QueueEntryId;

/// How a patient got their bed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionSource {
    /// Regular queue processing after a successful no-show draw
    Queue,
    /// Consent obtained by the voice agent
    Consent,
}

/// Simulation event capturing a state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Stay ended, bed freed
    PatientReleased {
        day: u32,
        bed_id: BedId,
        patient_id: PatientId,
    },

    /// Patient placed into a bed
    PatientAdmitted {
        day: u32,
        bed_id: BedId,
        patient_id: PatientId,
        days_of_stay: i32,
        source: AdmissionSource,
    },

    /// Patient did not arrive and was removed from the queue
    NoShow {
        day: u32,
        entry_id: QueueEntryId,
        patient_id: PatientId,
    },

    /// Voice agent call placed
    CallPlaced {
        day: u32,
        entry_id: QueueEntryId,
        consented: bool,
    },

    /// Consent recorded for the day's admission batch
    ConsentRegistered {
        day: u32,
        entry_id: QueueEntryId,
    },

    /// Consent could not be applied (entry left the queue meanwhile)
    ConsentSkipped {
        day: u32,
        entry_id: QueueEntryId,
        reason: String,
    },

    /// Day transition finished
    DayMaterialized {
        day: u32,
        occupied_beds: usize,
        queue_length: usize,
    },

    /// Clock moved back; `day` is the day rolled back to
    DayRolledBack { day: u32, from_day: u32 },

    /// Simulation reset to day 1
    SimulationReset { day: u32, seed: u64 },
}

impl Event {
    /// Day the event is attributed to
    pub fn day(&self) -> u32 {
        match self {
            Event::PatientReleased { day, .. } => *day,
            Event::PatientAdmitted { day, .. } => *day,
            Event::NoShow { day, .. } => *day,
            Event::CallPlaced { day, .. } => *day,
            Event::ConsentRegistered { day, .. } => *day,
            Event::ConsentSkipped { day, .. } => *day,
            Event::DayMaterialized { day, .. } => *day,
            Event::DayRolledBack { day, .. } => *day,
            Event::SimulationReset { day, .. } => *day,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::PatientReleased { .. } => "PatientReleased",
            Event::PatientAdmitted { .. } => "PatientAdmitted",
            Event::NoShow { .. } => "NoShow",
            Event::CallPlaced { .. } => "CallPlaced",
            Event::ConsentRegistered { .. } => "ConsentRegistered",
            Event::ConsentSkipped { .. } => "ConsentSkipped",
            Event::DayMaterialized { .. } => "DayMaterialized",
            Event::DayRolledBack { .. } => "DayRolledBack",
            Event::SimulationReset { .. } => "SimulationReset",
        }
    }

    /// Get patient ID if event relates to a specific patient
    pub fn patient_id(&self) -> Option<PatientId> {
        match self {
            Event::PatientReleased { patient_id, .. } => Some(*patient_id),
            Event::PatientAdmitted { patient_id, .. } => Some(*patient_id),
            Event::NoShow { patient_id, .. } => Some(*patient_id),
            _ => None,
        }
    }
}

/// Event log for storing and querying simulation events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_on_day(&self, day: u32) -> Vec<&Event> {
        self.events.iter().filter(|e| e.day() == day).collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_patient(&self, patient: PatientId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.patient_id() == Some(patient))
            .collect()
    }

    /// Drop every event attributed to a day after `day`
    pub fn truncate_after(&mut self, day: u32) {
        self.events.retain(|e| e.day() <= day);
    }

    /// Drop the transition events of exactly `day` (re-materialization),
    /// keeping control events (calls, consents, rollback, reset)
    pub fn clear_transition(&mut self, day: u32) {
        self.events.retain(|e| {
            e.day() != day
                || matches!(
                    e,
                    Event::CallPlaced { .. }
                        | Event::ConsentRegistered { .. }
                        | Event::DayRolledBack { .. }
                        | Event::SimulationReset { .. }
                )
        });
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
