//! Tables view returned to callers: beds, queue, today's no-shows and the
//! statistics block.

use serde::{Deserialize, Serialize};

use crate::agent::CallSuggestion;
use crate::models::{BedId, PatientId, QueueEntryId};
use crate::orchestrator::checkpoint::NoShowRecord;
use crate::stats::StatisticsBlock;

/// One bed, occupied or not
///
/// Unoccupied beds have no patient fields and a stay of 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedRow {
    pub bed_id: BedId,
    pub department: Option<String>,
    pub patient_id: Option<PatientId>,
    pub patient_name: Option<String>,
    pub pesel: Option<String>,
    pub sickness: Option<String>,
    pub procedure: Option<String>,
    pub doctor: Option<String>,
    pub days_of_stay: i32,
}

/// One queued patient; the PESEL is masked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRow {
    pub entry_id: QueueEntryId,
    pub position: u32,
    pub patient_id: PatientId,
    pub patient_name: String,
    pub pesel: String,
    pub urgency: Option<String>,
    pub sickness: String,
    pub procedure: Option<String>,
    pub department: Option<String>,
    pub doctor: Option<String>,
    pub requested_admission_day: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    pub day: u32,
    pub beds: Vec<BedRow>,
    pub queue: Vec<QueueRow>,
    pub no_shows: Vec<NoShowRecord>,
    pub statistics: StatisticsBlock,
}

/// First queued patient, offered a call while a bed is free
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCandidate {
    pub entry_id: QueueEntryId,
    pub position: u32,
    pub patient_id: PatientId,
    pub first_name: String,
    pub last_name: String,
    pub sickness: String,
    pub suggestion: CallSuggestion,
}

/// Result of one voice-agent call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub entry_id: QueueEntryId,
    pub consented: bool,
    pub suggestion: CallSuggestion,
}
