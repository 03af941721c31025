//! Day-advance engine
//!
//! Owns the clock, the RNG, the checkpoint store and the per-day series, and
//! drives the repository through day transitions.
//!
//! # Architecture
//!
//! The clock only moves the current day. Catching up happens lazily: every
//! query first calls [`SimulationEngine::materialize`], which runs the
//! transitions between the last checkpointed day and the current day.
//!
//! ```text
//! Before catching up:
//!   Admit consents registered on the latest computed day on top of its
//!   checkpoint (registry order, next free bed), amending that day's
//!   occupancy, average stay and checkpoint
//!
//! For each day d to materialize (d > 1):
//! 1. Decrement every remaining stay
//! 2. Release assignments at or below the release threshold
//! 3. Draw arrive/no-show for eligible queue entries (queue order)
//! 4. Record occupancy, average stay and no-show series
//! 5. Checkpoint repository contents and RNG state
//! ```
//!
//! Day 1 is the starting repository plus any consents registered on day 1.
//! Consents never re-run a computed day: its releases, draws and no-shows
//! stay as they were first reported.
//!
//! # Critical Invariants
//!
//! - **Once per day**: a day's transition runs once and is only re-run after
//!   a rollback or a reset; consents amend a computed day, never replay it
//! - **Determinism**: the transition into day `d` starts from the RNG state
//!   checkpointed for day `d - 1`, so it always draws the same values
//! - **Atomic passes**: a pass runs in one repository transaction; on error
//!   the repository, checkpoints, series and RNG return to the pre-pass state
//!
//! # Example
//!
//! ```rust
//! use bed_occupancy_core::models::{Bed, BedId, HospitalState};
//! use bed_occupancy_core::orchestrator::{SimulationConfig, SimulationEngine};
//! use bed_occupancy_core::repository::InMemoryRepository;
//!
//! let state = HospitalState::new(vec![Bed { id: BedId(1), department: None }], vec![], vec![], vec![]);
//! let mut engine = SimulationEngine::new(SimulationConfig::default(), InMemoryRepository::new(state)).unwrap();
//!
//! assert_eq!(engine.advance(1).unwrap(), 2);
//! let tables = engine.tables().unwrap();
//! assert_eq!(tables.day, 2);
//! assert_eq!(tables.beds.len(), 1);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::agent::{suggest_call_days, NegotiationRequest, VoiceAgent};
use crate::core::{ClockMove, Direction, SimulationClock, FIRST_DAY};
use crate::models::{
    AdmissionSource, BedAssignment, BedId, ConsentRegistry, Department, Event, EventLog,
    MetricValue, Patient, PatientId, ProcedureId, QueueEntry, QueueEntryId, Sentinel, TimeSeries,
};
use crate::orchestrator::checkpoint::{
    compute_config_hash, validate_snapshot, CheckpointStore, DayCheckpoint, NoShowRecord,
    SimulationSnapshot,
};
use crate::orchestrator::config::{AdmissionMode, BedPoolMode, SimulationConfig};
use crate::orchestrator::tables::{BedRow, CallCandidate, CallOutcome, QueueRow, Tables};
use crate::orchestrator::SimulationError;
use crate::repository::{BedRepository, InMemoryRepository};
use crate::rng::{RngCheckpoint, RngManager};
use crate::stats::{consent_percentages, StatisticsBlock};

/// Salt separating consent stay draws from other derived streams
const CONSENT_STREAM: u64 = 0xC0;

// ============================================================================
// Interruption
// ============================================================================

/// Cooperative stop flag checked between day transitions
///
/// Clones share the flag, so one can be handed to another thread.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Result of a materialization pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeOutcome {
    /// Last fully materialized day
    pub day: u32,
    /// Days computed by this pass, in order
    pub materialized: Vec<u32>,
    /// Whether the pass stopped early on an interrupt
    pub interrupted: bool,
}

// ============================================================================
// Engine
// ============================================================================

/// Beds a queue entry may be admitted into
#[derive(Debug, Clone, PartialEq, Eq)]
enum BedPool {
    /// Every free bed
    Shared,
    Department(Department),
    /// Department pools, but the entry's procedure names no department
    Unplaceable,
}

/// Per-day derived data, restored as a whole when a pass fails
#[derive(Debug, Clone, Default)]
struct History {
    occupancy: TimeSeries,
    average_stay: TimeSeries,
    no_shows: TimeSeries,
    consents: ConsentRegistry,
    events: EventLog,
}

impl History {
    fn prune_after(&mut self, day: u32) {
        self.occupancy.truncate_after(day);
        self.average_stay.truncate_after(day);
        self.no_shows.truncate_after(day);
        self.consents.prune_after(day);
        self.events.truncate_after(day);
    }
}

/// Deterministic day-by-day bed occupancy simulation
pub struct SimulationEngine<R: BedRepository> {
    config: SimulationConfig,
    repo: R,
    clock: SimulationClock,
    rng: RngManager,
    checkpoints: CheckpointStore<R::Snapshot>,
    history: History,
}

impl<R: BedRepository> SimulationEngine<R> {
    /// Create an engine positioned on day 1 of `repo`'s current contents
    pub fn new(config: SimulationConfig, repo: R) -> Result<Self, SimulationError> {
        config.validate()?;
        repo.validate().map_err(SimulationError::ConsistencyViolation)?;

        let baseline = repo.snapshot();
        let mut engine = Self {
            clock: SimulationClock::new(config.max_day),
            rng: RngManager::new(config.rng_seed),
            checkpoints: CheckpointStore::new(baseline),
            history: History::default(),
            repo,
            config,
        };
        engine.materialize()?;
        Ok(engine)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn current_day(&self) -> u32 {
        self.clock.current_day()
    }

    pub fn last_direction(&self) -> Direction {
        self.clock.last_direction()
    }

    /// Last day with a checkpoint
    pub fn materialized_day(&self) -> u32 {
        self.checkpoints.last_day()
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn events(&self) -> &EventLog {
        &self.history.events
    }

    pub fn consents(&self) -> &ConsentRegistry {
        &self.history.consents
    }

    pub fn checkpoints(&self) -> &CheckpointStore<R::Snapshot> {
        &self.checkpoints
    }

    pub fn occupancy_series(&self) -> &TimeSeries {
        &self.history.occupancy
    }

    pub fn average_stay_series(&self) -> &TimeSeries {
        &self.history.average_stay
    }

    pub fn no_show_series(&self) -> &TimeSeries {
        &self.history.no_shows
    }

    /// Current position of the simulation RNG stream
    pub fn rng_checkpoint(&self) -> RngCheckpoint {
        self.rng.checkpoint()
    }

    // ========================================================================
    // Clock Control
    // ========================================================================

    /// Move one day forward or back; returns the new current day
    ///
    /// Moving back discards everything derived for later days and restores
    /// the repository and RNG from the new day's checkpoint. Moving forward
    /// does no work until the next query.
    pub fn advance(&mut self, delta: i32) -> Result<u32, SimulationError> {
        let from = self.clock.current_day();
        match self.clock.advance(delta)? {
            ClockMove::Moved(Direction::Backward) => {
                let day = self.clock.current_day();
                self.discard_after(day);
                self.history
                    .events
                    .log(Event::DayRolledBack { day, from_day: from });
                info!("Rollback of simulation to day {}", day);
            }
            ClockMove::Moved(Direction::Forward) => {
                debug!("Clock moved to day {}", self.clock.current_day());
            }
            ClockMove::Unchanged => {
                debug!("Day {} is a boundary, delta {} ignored", from, delta);
            }
        }
        Ok(self.clock.current_day())
    }

    /// Return to day 1 of the starting repository contents with a fresh RNG
    pub fn reset(&mut self) -> Result<u32, SimulationError> {
        self.clock.reset();
        self.checkpoints.reset();
        self.history = History::default();
        self.restore_latest();
        self.history.events.log(Event::SimulationReset {
            day: FIRST_DAY,
            seed: self.config.rng_seed,
        });
        self.materialize()?;
        info!("Simulation reset to day {}", FIRST_DAY);
        Ok(FIRST_DAY)
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    /// Catch up to the current day
    pub fn materialize(&mut self) -> Result<MaterializeOutcome, SimulationError> {
        let current = self.clock.current_day();
        self.materialize_until(current, &Interrupt::new())
    }

    /// Catch up to `target`, checking `interrupt` before every day
    ///
    /// On interrupt, every day completed so far is kept and committed.
    pub fn materialize_until(
        &mut self,
        target: u32,
        interrupt: &Interrupt,
    ) -> Result<MaterializeOutcome, SimulationError> {
        let current = self.clock.current_day();
        if target > current {
            return Err(SimulationError::InvalidInput(format!(
                "Cannot materialize day {} ahead of current day {}",
                target, current
            )));
        }

        self.apply_pending_consents()?;

        let start = self.checkpoints.last_day() + 1;
        if start > target {
            return Ok(MaterializeOutcome {
                day: self.checkpoints.last_day(),
                materialized: Vec::new(),
                interrupted: false,
            });
        }

        let forward = self.clock.last_direction() == Direction::Forward;
        if forward {
            info!("Current simulation day: {}", current);
        } else {
            info!("Rollback of simulation to day {}", current);
        }

        let saved_history = self.history.clone();
        let saved_rng = self.rng.checkpoint();
        let base_day = self.checkpoints.last_day();

        self.repo.begin();
        let mut materialized = Vec::new();
        let mut interrupted = false;
        for day in start..=target {
            if interrupt.is_triggered() {
                warn!("Materialization interrupted before day {}", day);
                interrupted = true;
                break;
            }
            let loud = forward && day == current;
            if let Err(err) = self.transition(day, loud) {
                self.checkpoints.prune_after(base_day);
                self.history = saved_history;
                self.rng.restore(saved_rng);
                self.repo.rollback()?;
                return Err(SimulationError::transaction_failure(day, err));
            }
            materialized.push(day);
        }
        self.repo.commit()?;

        Ok(MaterializeOutcome {
            day: self.checkpoints.last_day(),
            materialized,
            interrupted,
        })
    }

    /// One day's transition, producing `day` from the latest checkpoint
    ///
    /// Only a `loud` transition logs at info level.
    fn transition(&mut self, day: u32, loud: bool) -> Result<(), SimulationError> {
        self.history.events.clear_transition(day);

        let mut released = 0;
        if day > FIRST_DAY {
            self.repo.decrement_stays();
            released = self.release_due(day, loud)?;
        }

        let (expected_arrivals, no_shows) = if day > FIRST_DAY {
            self.draw_arrivals(day, released, loud)?
        } else {
            (0, Vec::new())
        };

        self.repo
            .validate()
            .map_err(SimulationError::ConsistencyViolation)?;

        let (occupancy, average_stay) = self.bed_metrics();
        let no_show_rate = MetricValue::percentage(
            no_shows.len(),
            expected_arrivals,
            Sentinel::NoIncomingPatients,
        );

        let series = [
            (&mut self.history.occupancy, occupancy),
            (&mut self.history.average_stay, average_stay),
            (&mut self.history.no_shows, no_show_rate),
        ];
        for (series, value) in series {
            series
                .record(day, value)
                .map_err(SimulationError::ConsistencyViolation)?;
        }

        if loud && !no_shows.is_empty() {
            let names: Vec<&str> = no_shows.iter().map(|n| n.patient_name.as_str()).collect();
            info!("No-shows on day {}: {}", day, names.join(", "));
        }

        self.checkpoints.push(DayCheckpoint {
            day,
            rng: self.rng.checkpoint(),
            state: self.repo.snapshot(),
            no_shows,
        })?;
        let occupied = self.repo.assignments().len();
        let queued = self.repo.list_queue(None).len();
        self.history.events.log(Event::DayMaterialized {
            day,
            occupied_beds: occupied,
            queue_length: queued,
        });

        if loud {
            info!(
                "Day {}: {}/{} beds occupied, {} patients queued",
                day,
                occupied,
                self.repo.total_beds(),
                queued
            );
        } else {
            debug!("Replayed day {}", day);
        }
        Ok(())
    }

    /// Release step; returns the number of freed beds
    fn release_due(&mut self, day: u32, loud: bool) -> Result<usize, SimulationError> {
        let threshold = self.config.release_threshold;
        let due = self.repo.list_assignments_at_or_below(threshold);

        if loud && !due.is_empty() {
            let lines: Vec<String> = due
                .iter()
                .map(|a| format!("Patient ID: {}, Name: {}", a.patient_id, self.patient_name(a.patient_id)))
                .collect();
            info!("Patients to be released from hospital:\n{}", lines.join("\n"));
        }
        for assignment in &due {
            trace!("Releasing bed {}", assignment.bed_id);
            self.history.events.log(Event::PatientReleased {
                day,
                bed_id: assignment.bed_id,
                patient_id: assignment.patient_id,
            });
        }

        let deleted = self.repo.delete_assignments_at_or_below(threshold);
        if deleted != due.len() {
            return Err(SimulationError::ConsistencyViolation(format!(
                "{} assignments due on day {} but {} deleted",
                due.len(),
                day,
                deleted
            )));
        }
        Ok(deleted)
    }

    /// Admit the consents still pending on the latest computed day
    ///
    /// Runs in its own repository transaction; on error the repository and
    /// history are left as they were.
    fn apply_pending_consents(&mut self) -> Result<(), SimulationError> {
        let Some(day) = self.checkpoints.latest().map(|c| c.day) else {
            return Ok(());
        };
        if !self.history.consents.has_pending(day) {
            return Ok(());
        }

        let saved_history = self.history.clone();
        self.repo.begin();
        if let Err(err) = self.amend_day(day) {
            self.history = saved_history;
            self.repo.rollback()?;
            return Err(SimulationError::transaction_failure(day, err));
        }
        self.repo.commit()?;
        Ok(())
    }

    /// Consent admissions on top of `day`'s checkpoint, which is replaced
    /// by the amended state; the RNG stream and no-show list are kept
    fn amend_day(&mut self, day: u32) -> Result<(), SimulationError> {
        let (rng, no_shows) = match self.checkpoints.latest() {
            Some(latest) if latest.day == day => (latest.rng, latest.no_shows.clone()),
            _ => {
                return Err(SimulationError::ConsistencyViolation(format!(
                    "no checkpoint to amend for day {}",
                    day
                )))
            }
        };

        let entries = self.history.consents.pending_for(day);
        let applied = self.admit_consents(day, &entries)?;
        self.repo
            .validate()
            .map_err(SimulationError::ConsistencyViolation)?;

        let (occupancy, average_stay) = self.bed_metrics();
        self.history
            .occupancy
            .amend_last(day, occupancy)
            .map_err(SimulationError::ConsistencyViolation)?;
        self.history
            .average_stay
            .amend_last(day, average_stay)
            .map_err(SimulationError::ConsistencyViolation)?;

        self.checkpoints.replace_latest(DayCheckpoint {
            day,
            rng,
            state: self.repo.snapshot(),
            no_shows,
        })?;
        debug!("Day {} amended with {} consents", day, applied.len());
        self.history.consents.commit(day, applied);
        Ok(())
    }

    /// Consent batch in registry order; returns the entries actually admitted
    fn admit_consents(
        &mut self,
        day: u32,
        entries: &[QueueEntryId],
    ) -> Result<Vec<QueueEntryId>, SimulationError> {
        let mut applied = Vec::new();
        for &entry_id in entries {
            let Some(entry) = self.repo.queue_entry(entry_id) else {
                self.skip_consent(day, entry_id, "entry is no longer queued");
                continue;
            };
            if self.is_admitted(entry.patient_id) {
                self.skip_consent(day, entry_id, "patient already has a bed");
                continue;
            }

            let bed = match self.pool_for(&entry) {
                BedPool::Unplaceable => {
                    self.skip_consent(day, entry_id, "procedure has no department");
                    continue;
                }
                pool => self.free_bed(&pool).ok_or_else(|| {
                    SimulationError::ConsistencyViolation(format!(
                        "consent admissions on day {} exceed free beds (entry {})",
                        day, entry_id
                    ))
                })?,
            };
            let days = match entry.expected_days_of_stay {
                Some(days) => days,
                None => self.consent_stay(day, entry_id),
            };
            self.admit(day, bed, &entry, days, AdmissionSource::Consent, true)?;
            applied.push(entry_id);
        }
        Ok(applied)
    }

    fn skip_consent(&mut self, day: u32, entry_id: QueueEntryId, reason: &str) {
        warn!("Consent for queue entry {} skipped: {}", entry_id, reason);
        self.history.events.log(Event::ConsentSkipped {
            day,
            entry_id,
            reason: reason.to_string(),
        });
    }

    /// No-show step; returns the expected arrival count and the no-shows
    fn draw_arrivals(
        &mut self,
        day: u32,
        released: usize,
        loud: bool,
    ) -> Result<(usize, Vec<NoShowRecord>), SimulationError> {
        let (eligible, expected): (Vec<QueueEntry>, usize) = match self.config.admission_mode {
            AdmissionMode::ReleasedSlots => (
                self.repo.list_queue(None).into_iter().take(released).collect(),
                released,
            ),
            AdmissionMode::AdmissionDay => {
                let eligible = self.repo.list_queue(Some(day));
                let count = eligible.len();
                (eligible, count)
            }
        };

        let weights = self.config.no_show_weights;
        let mut no_shows = Vec::new();
        for entry in eligible {
            let Some(bed) = self.free_bed(&self.pool_for(&entry)) else {
                trace!("No free bed for queue entry {}, no draw", entry.id);
                continue;
            };

            if !self.rng.weighted_bool(weights.arrive, weights.no_show) {
                self.repo.delete_queue_entry(entry.id)?;
                let patient_name = self.patient_name(entry.patient_id);
                if loud {
                    info!("No-show: {}", patient_name);
                }
                self.history.events.log(Event::NoShow {
                    day,
                    entry_id: entry.id,
                    patient_id: entry.patient_id,
                });
                no_shows.push(NoShowRecord {
                    entry_id: entry.id,
                    patient_id: entry.patient_id,
                    patient_name,
                });
                continue;
            }

            if self.is_admitted(entry.patient_id) {
                if loud {
                    info!("Patient {} already has a bed", entry.patient_id);
                }
                continue;
            }

            let days = match entry.expected_days_of_stay {
                Some(days) => days,
                None => self.draw_stay(),
            };
            self.admit(day, bed, &entry, days, AdmissionSource::Queue, loud)?;
        }
        Ok((expected, no_shows))
    }

    fn admit(
        &mut self,
        day: u32,
        bed: BedId,
        entry: &QueueEntry,
        days_of_stay: i32,
        source: AdmissionSource,
        loud: bool,
    ) -> Result<(), SimulationError> {
        let procedure = entry.procedure.or_else(|| {
            self.repo
                .patient(entry.patient_id)
                .and_then(|p| p.procedure)
        });
        self.repo.delete_queue_entry(entry.id)?;
        self.repo.create_assignment(BedAssignment::new(
            bed,
            entry.patient_id,
            procedure,
            days_of_stay,
        ))?;

        if loud {
            info!(
                "Assigned bed {} to {} for {} days",
                bed,
                self.patient_name(entry.patient_id),
                days_of_stay
            );
        }
        self.history.events.log(Event::PatientAdmitted {
            day,
            bed_id: bed,
            patient_id: entry.patient_id,
            days_of_stay,
            source,
        });
        Ok(())
    }

    fn draw_stay(&mut self) -> i32 {
        let range = self.config.stay_length;
        self.rng.range_inclusive(range.min as i64, range.max as i64) as i32
    }

    /// Stay of a consent admission, drawn off the main stream so that adding
    /// a consent does not shift the day's queue draws
    fn consent_stay(&self, day: u32, entry: QueueEntryId) -> i32 {
        let range = self.config.stay_length;
        RngManager::derived(self.config.rng_seed, &[CONSENT_STREAM, day as u64, entry.0 as u64])
            .range_inclusive(range.min as i64, range.max as i64) as i32
    }

    fn pool_for(&self, entry: &QueueEntry) -> BedPool {
        match self.config.bed_pools {
            BedPoolMode::Shared => BedPool::Shared,
            BedPoolMode::ByDepartment => entry
                .procedure
                .or_else(|| self.repo.patient(entry.patient_id).and_then(|p| p.procedure))
                .and_then(|id| self.repo.procedure(id))
                .map_or(BedPool::Unplaceable, |procedure| {
                    BedPool::Department(procedure.department)
                }),
        }
    }

    /// Lowest free bed of `pool`
    fn free_bed(&self, pool: &BedPool) -> Option<BedId> {
        let department = match pool {
            BedPool::Shared => None,
            BedPool::Department(department) => Some(department),
            BedPool::Unplaceable => return None,
        };
        self.repo.list_free_beds(department).first().copied()
    }

    /// Occupancy percentage and average remaining stay of the current beds
    fn bed_metrics(&self) -> (MetricValue, MetricValue) {
        let assignments = self.repo.assignments();
        let occupancy =
            MetricValue::percentage(assignments.len(), self.repo.total_beds(), Sentinel::NoBeds);
        let average_stay = if assignments.is_empty() {
            0.0
        } else {
            assignments.iter().map(|a| a.days_of_stay as f64).sum::<f64>()
                / assignments.len() as f64
        };
        (occupancy, MetricValue::Value(average_stay))
    }

    fn is_admitted(&self, patient: PatientId) -> bool {
        self.repo.assignments().iter().any(|a| a.patient_id == patient)
    }

    fn patient_name(&self, id: PatientId) -> String {
        self.repo
            .patient(id)
            .map(|p| p.full_name())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn patient(&self, id: PatientId) -> Result<Patient, SimulationError> {
        self.repo
            .patient(id)
            .ok_or_else(|| SimulationError::InvalidInput(format!("Patient {} not found", id)))
    }

    fn queued(&self, entry_id: QueueEntryId) -> Result<QueueEntry, SimulationError> {
        self.repo.queue_entry(entry_id).ok_or_else(|| {
            SimulationError::InvalidInput(format!("Queue entry {} not found", entry_id))
        })
    }

    // ========================================================================
    // Rewinding
    // ========================================================================

    /// Drop everything derived after `day` (clock moved back)
    fn discard_after(&mut self, day: u32) {
        self.checkpoints.prune_after(day);
        self.history.prune_after(day);
        self.restore_latest();
    }

    /// Put the repository and RNG back to the latest checkpoint
    fn restore_latest(&mut self) {
        match self.checkpoints.latest() {
            Some(checkpoint) => {
                self.repo.restore(checkpoint.state.clone());
                self.rng.restore(checkpoint.rng);
            }
            None => {
                self.repo.restore(self.checkpoints.baseline().clone());
                self.rng = RngManager::new(self.config.rng_seed);
            }
        }
    }

    // ========================================================================
    // Consents and Calls
    // ========================================================================

    /// Record a patient's consent to be admitted on the current day
    ///
    /// The patient takes the next free bed of their pool on the next query,
    /// without re-running the day's releases or draws.
    pub fn register_consent(&mut self, entry_id: QueueEntryId) -> Result<(), SimulationError> {
        self.materialize()?;
        let day = self.clock.current_day();
        let entry = self.admissible(day, entry_id)?;

        self.history.consents.register(day, entry_id);
        self.history
            .events
            .log(Event::ConsentRegistered { day, entry_id });
        info!(
            "Consent registered for {} (queue entry {}) on day {}",
            self.patient_name(entry.patient_id),
            entry_id,
            day
        );
        Ok(())
    }

    /// Queue entry that could take a bed by consent on `day`
    fn admissible(&self, day: u32, entry_id: QueueEntryId) -> Result<QueueEntry, SimulationError> {
        let entry = self.queued(entry_id)?;
        if self.history.consents.is_registered(day, entry_id) {
            return Err(SimulationError::InvalidInput(format!(
                "Consent for queue entry {} already registered on day {}",
                entry_id, day
            )));
        }
        let pool = self.pool_for(&entry);
        if pool == BedPool::Unplaceable {
            return Err(SimulationError::InvalidInput(format!(
                "Queue entry {} has no procedure department to admit into",
                entry_id
            )));
        }
        if self.free_bed(&pool).is_none() {
            return Err(SimulationError::NoCapacity(format!(
                "No free bed for queue entry {} on day {}",
                entry_id, day
            )));
        }
        Ok(entry)
    }

    /// Count one more call on the current day; returns the day's total
    pub fn increment_calls(&mut self) -> u32 {
        self.history
            .consents
            .increment_calls(self.clock.current_day())
    }

    /// Drop consents registered on the current day and not yet applied
    pub fn rollback_pending(&mut self) -> usize {
        let day = self.clock.current_day();
        let dropped = self.history.consents.discard_pending(day);
        if dropped > 0 {
            info!("Discarded {} pending consents on day {}", dropped, day);
        }
        dropped
    }

    /// First queued patient, when a bed of their pool is free
    pub fn call_candidate(&mut self) -> Result<Option<CallCandidate>, SimulationError> {
        self.materialize()?;
        let Some(entry) = self.repo.list_queue(None).into_iter().next() else {
            return Ok(None);
        };
        if self.free_bed(&self.pool_for(&entry)).is_none() {
            return Ok(None);
        }
        let patient = self.patient(entry.patient_id)?;
        Ok(Some(CallCandidate {
            entry_id: entry.id,
            position: entry.position,
            patient_id: patient.id,
            first_name: patient.first_name,
            last_name: patient.last_name,
            sickness: patient.sickness,
            suggestion: suggest_call_days(self.config.rng_seed, self.clock.current_day(), &entry),
        }))
    }

    /// Call a queued patient and register the consent when they agree
    ///
    /// A patient who could not be admitted is not called, so the call
    /// counter only moves for calls that can end in a consent.
    pub fn call_patient(
        &mut self,
        entry_id: QueueEntryId,
        agent: &mut dyn VoiceAgent,
    ) -> Result<CallOutcome, SimulationError> {
        self.materialize()?;
        let day = self.clock.current_day();
        let entry = self.admissible(day, entry_id)?;
        let patient = self.patient(entry.patient_id)?;
        let suggestion = suggest_call_days(self.config.rng_seed, day, &entry);

        let request = NegotiationRequest {
            patient_name: patient.first_name,
            patient_surname: patient.last_name,
            sickness: patient.sickness,
            current_visit_day: suggestion.old_day,
            suggested_appointment_day: suggestion.new_day,
        };
        self.history.consents.increment_calls(day);
        let consented = agent.negotiate(&request)?;
        self.history.events.log(Event::CallPlaced {
            day,
            entry_id,
            consented,
        });

        if consented {
            self.register_consent(entry_id)?;
        }
        Ok(CallOutcome {
            entry_id,
            consented,
            suggestion,
        })
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn statistics(&mut self) -> Result<StatisticsBlock, SimulationError> {
        self.materialize()?;
        Ok(self.statistics_block())
    }

    fn statistics_block(&self) -> StatisticsBlock {
        let consents = consent_percentages(&self.history.consents, self.checkpoints.last_day());
        StatisticsBlock::compute(
            &self.history.occupancy,
            &self.history.average_stay,
            &self.history.no_shows,
            &consents,
        )
    }

    /// Beds, queue, today's no-shows and statistics for the current day
    pub fn tables(&mut self) -> Result<Tables, SimulationError> {
        self.materialize()?;

        let assignments = self.repo.assignments();
        let beds = self
            .repo
            .beds()
            .into_iter()
            .map(|bed| {
                let mut row = BedRow {
                    bed_id: bed.id,
                    department: bed.department.as_ref().map(|d| d.name().to_string()),
                    patient_id: None,
                    patient_name: None,
                    pesel: None,
                    sickness: None,
                    procedure: None,
                    doctor: None,
                    days_of_stay: 0,
                };
                if let Some(assignment) = assignments.iter().find(|a| a.bed_id == bed.id) {
                    let patient = self.repo.patient(assignment.patient_id);
                    let (procedure, doctor) = self.procedure_labels(assignment.procedure);
                    row.patient_id = Some(assignment.patient_id);
                    row.patient_name = patient.as_ref().map(Patient::full_name);
                    row.pesel = patient.as_ref().map(|p| p.pesel.clone());
                    row.sickness = patient.map(|p| p.sickness);
                    row.procedure = procedure;
                    row.doctor = doctor;
                    row.days_of_stay = assignment.days_of_stay;
                }
                row
            })
            .collect();

        let queue = self
            .repo
            .list_queue(None)
            .into_iter()
            .map(|entry| {
                let patient = self.repo.patient(entry.patient_id);
                let procedure_id = entry
                    .procedure
                    .or_else(|| patient.as_ref().and_then(|p| p.procedure));
                let (procedure, doctor) = self.procedure_labels(procedure_id);
                let department = procedure_id
                    .and_then(|id| self.repo.procedure(id))
                    .map(|p| p.department.name().to_string());
                QueueRow {
                    entry_id: entry.id,
                    position: entry.position,
                    patient_id: entry.patient_id,
                    patient_name: patient
                        .as_ref()
                        .map(Patient::full_name)
                        .unwrap_or_else(|| "Unknown".to_string()),
                    pesel: patient.as_ref().map(Patient::masked_pesel).unwrap_or_default(),
                    urgency: patient.as_ref().and_then(|p| p.urgency.clone()),
                    sickness: patient.map(|p| p.sickness).unwrap_or_default(),
                    procedure,
                    department,
                    doctor,
                    requested_admission_day: entry.requested_admission_day,
                }
            })
            .collect();

        let no_shows = self
            .checkpoints
            .latest()
            .map(|c| c.no_shows.clone())
            .unwrap_or_default();

        Ok(Tables {
            day: self.checkpoints.last_day(),
            beds,
            queue,
            no_shows,
            statistics: self.statistics_block(),
        })
    }

    fn procedure_labels(
        &self,
        procedure: Option<ProcedureId>,
    ) -> (Option<String>, Option<String>) {
        let Some(procedure) = procedure.and_then(|id| self.repo.procedure(id)) else {
            return (None, None);
        };
        let doctor = procedure
            .doctor
            .and_then(|id| self.repo.doctor(id))
            .map(|d| d.full_name());
        (Some(procedure.name), doctor)
    }
}

// ============================================================================
// Snapshot Export / Import
// ============================================================================

impl SimulationEngine<InMemoryRepository> {
    /// Capture the complete engine state after catching up
    pub fn export_snapshot(&mut self) -> Result<SimulationSnapshot, SimulationError> {
        self.materialize()?;
        Ok(SimulationSnapshot {
            config: self.config.clone(),
            config_hash: compute_config_hash(&self.config)?,
            current_day: self.clock.current_day(),
            last_direction: self.clock.last_direction(),
            checkpoints: self.checkpoints.clone(),
            occupancy: self.history.occupancy.clone(),
            average_stay: self.history.average_stay.clone(),
            no_shows: self.history.no_shows.clone(),
            consents: self.history.consents.clone(),
            events: self.history.events.clone(),
        })
    }

    /// Resume from a snapshot exported with the same `config`
    pub fn from_snapshot(
        config: SimulationConfig,
        snapshot: SimulationSnapshot,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        validate_snapshot(&snapshot, &config)?;

        let latest = snapshot.checkpoints.latest().ok_or_else(|| {
            SimulationError::ConsistencyViolation("snapshot has no materialized day".to_string())
        })?;
        let repo = InMemoryRepository::new(latest.state.clone());
        let rng = RngManager::from_checkpoint(latest.rng);

        let mut clock = SimulationClock::new(config.max_day);
        clock.set_position(snapshot.current_day, snapshot.last_direction);

        Ok(Self {
            config,
            repo,
            clock,
            rng,
            checkpoints: snapshot.checkpoints,
            history: History {
                occupancy: snapshot.occupancy,
                average_stay: snapshot.average_stay,
                no_shows: snapshot.no_shows,
                consents: snapshot.consents,
                events: snapshot.events,
            },
        })
    }
}
