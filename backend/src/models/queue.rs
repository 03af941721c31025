//! Patient waiting queue
//!
//! # Critical Invariants
//!
//! 1. **Dense positions**: positions are exactly `1..=len` in order, with no
//!    gaps or duplicates. Every removal re-packs the entries behind it.
//! 2. **Stable identity**: a [`QueueEntryId`] never changes while the entry is
//!    queued, unlike its position. Consents refer to entries by id.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::patient::{PatientId, ProcedureId};

/// Stable queue entry identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueEntryId(pub u32);

impl fmt::Display for QueueEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A patient waiting for admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    /// 1-based place in the queue
    pub position: u32,
    pub patient_id: PatientId,
    #[serde(default)]
    pub procedure: Option<ProcedureId>,
    /// Day the patient is booked for (admission-day mode only)
    #[serde(default)]
    pub requested_admission_day: Option<u32>,
    /// Pre-planned length of stay; drawn at admission when absent
    #[serde(default)]
    pub expected_days_of_stay: Option<i32>,
}

/// Ordered queue of waiting patients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientQueue {
    entries: Vec<QueueEntry>,
    next_id: u32,
}

/// Parameters for a new queue entry; position and id are assigned on push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQueueEntry {
    pub patient_id: PatientId,
    #[serde(default)]
    pub procedure: Option<ProcedureId>,
    #[serde(default)]
    pub requested_admission_day: Option<u32>,
    #[serde(default)]
    pub expected_days_of_stay: Option<i32>,
}

impl PatientQueue {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Append an entry at the back of the queue
    pub fn push(&mut self, entry: NewQueueEntry) -> QueueEntryId {
        let id = QueueEntryId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.entries.push(QueueEntry {
            id,
            position: self.entries.len() as u32 + 1,
            patient_id: entry.patient_id,
            procedure: entry.procedure,
            requested_admission_day: entry.requested_admission_day,
            expected_days_of_stay: entry.expected_days_of_stay,
        });
        id
    }

    /// Remove an entry and re-pack positions of everything behind it
    ///
    /// Returns the removed entry, or `None` if the id is not queued.
    pub fn remove(&mut self, id: QueueEntryId) -> Option<QueueEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        let removed = self.entries.remove(index);
        for (offset, entry) in self.entries.iter_mut().enumerate().skip(index) {
            entry.position = offset as u32 + 1;
        }
        Some(removed)
    }

    pub fn get(&self, id: QueueEntryId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries in ascending position order
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn first(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the dense-position invariant
    ///
    /// Returns a description of the first violation found.
    pub fn check_packed(&self) -> Result<(), String> {
        for (index, entry) in self.entries.iter().enumerate() {
            let expected = index as u32 + 1;
            if entry.position != expected {
                return Err(format!(
                    "queue entry {} has position {}, expected {}",
                    entry.id, entry.position, expected
                ));
            }
        }
        let mut ids: Vec<QueueEntryId> = self.entries.iter().map(|e| e.id).collect();
        ids.sort();
        if ids.windows(2).any(|w| w[0] == w[1]) {
            return Err("duplicate queue entry id".to_string());
        }
        Ok(())
    }
}
