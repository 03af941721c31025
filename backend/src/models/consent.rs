//! Consent registry and call counter
//!
//! Records, per day, the queue entries whose patients agreed (through the
//! voice agent) to be admitted on that day ahead of the normal queue order,
//! and how many calls were placed that day.
//!
//! Consents go through two stages:
//! - **pending**: registered on the current day, not yet applied to beds
//! - **committed**: admitted on top of that day's checkpoint
//!
//! Committed consents are kept as history for the consent-rate statistic;
//! rollback prunes everything after the target day.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::queue::QueueEntryId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRegistry {
    committed: BTreeMap<u32, Vec<QueueEntryId>>,
    pending: BTreeMap<u32, Vec<QueueEntryId>>,
    calls: BTreeMap<u32, u32>,
}

impl ConsentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending consent; returns false if the entry is already
    /// registered for that day
    pub fn register(&mut self, day: u32, entry: QueueEntryId) -> bool {
        if self.is_registered(day, entry) {
            return false;
        }
        self.pending.entry(day).or_default().push(entry);
        true
    }

    pub fn is_registered(&self, day: u32, entry: QueueEntryId) -> bool {
        let in_list = |map: &BTreeMap<u32, Vec<QueueEntryId>>| {
            map.get(&day).map_or(false, |ids| ids.contains(&entry))
        };
        in_list(&self.committed) || in_list(&self.pending)
    }

    /// Consents registered on `day` and not yet applied, in registry order
    pub fn pending_for(&self, day: u32) -> Vec<QueueEntryId> {
        self.pending.get(&day).cloned().unwrap_or_default()
    }

    /// Consents already admitted on `day`, in admission order
    pub fn committed_on(&self, day: u32) -> &[QueueEntryId] {
        self.committed.get(&day).map_or(&[], Vec::as_slice)
    }

    pub fn has_pending(&self, day: u32) -> bool {
        self.pending.get(&day).map_or(false, |ids| !ids.is_empty())
    }

    pub fn pending_count(&self, day: u32) -> usize {
        self.pending.get(&day).map_or(0, Vec::len)
    }

    /// Append the consents that were actually applied on `day` and clear
    /// its pending list
    pub fn commit(&mut self, day: u32, applied: Vec<QueueEntryId>) {
        self.pending.remove(&day);
        if !applied.is_empty() {
            self.committed.entry(day).or_default().extend(applied);
        }
    }

    /// Drop pending consents for `day`; returns how many were dropped
    pub fn discard_pending(&mut self, day: u32) -> usize {
        self.pending.remove(&day).map_or(0, |ids| ids.len())
    }

    /// Count one more call placed on `day`
    pub fn increment_calls(&mut self, day: u32) -> u32 {
        let count = self.calls.entry(day).or_insert(0);
        *count += 1;
        *count
    }

    pub fn calls_on(&self, day: u32) -> u32 {
        self.calls.get(&day).copied().unwrap_or(0)
    }

    /// Number of applied consents on `day`
    pub fn consents_on(&self, day: u32) -> usize {
        self.committed.get(&day).map_or(0, Vec::len)
    }

    /// Forget consents and calls recorded for days after `day`
    pub fn prune_after(&mut self, day: u32) {
        self.committed.split_off(&(day + 1));
        self.pending.split_off(&(day + 1));
        self.calls.split_off(&(day + 1));
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.pending.clear();
        self.calls.clear();
    }
}
