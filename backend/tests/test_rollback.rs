//! Rollback Tests
//!
//! Critical invariants tested:
//! - Moving back a day restores exactly the state that day had
//! - The state on day d does not depend on the path of moves that reached it
//! - A failed materialization pass leaves no trace: repository, RNG, series
//!   and checkpoints are as before the pass

use bed_occupancy_core::models::{
    Bed, BedAssignment, BedId, Department, Doctor, DoctorId, Event, HospitalState,
    MedicalProcedure, Patient, PatientId, ProcedureId, QueueEntry, QueueEntryId,
};
use bed_occupancy_core::orchestrator::{SimulationConfig, SimulationEngine, SimulationError};
use bed_occupancy_core::repository::{BedRepository, InMemoryRepository, RepositoryError};
use bed_occupancy_core::{GeneratorConfig, Scenario};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn generated_state(seed: u64) -> HospitalState {
    let generator = GeneratorConfig {
        beds: 6,
        patients: 24,
        ..GeneratorConfig::default()
    };
    Scenario::generate(&generator, seed).into_state().unwrap()
}

fn engine(seed: u64) -> SimulationEngine<InMemoryRepository> {
    let config = SimulationConfig {
        rng_seed: seed,
        ..SimulationConfig::default()
    };
    SimulationEngine::new(config, InMemoryRepository::new(generated_state(seed))).unwrap()
}

fn engine_on_day(seed: u64, day: u32) -> SimulationEngine<InMemoryRepository> {
    let mut engine = engine(seed);
    for _ in 1..day {
        engine.advance(1).unwrap();
    }
    engine.materialize().unwrap();
    engine
}

/// Repository that misreports the number of released assignments on one call
struct MiscountingRepository {
    inner: InMemoryRepository,
    release_calls: usize,
    miscount_on: usize,
}

impl MiscountingRepository {
    fn new(inner: InMemoryRepository, miscount_on: usize) -> Self {
        Self {
            inner,
            release_calls: 0,
            miscount_on,
        }
    }
}

impl BedRepository for MiscountingRepository {
    type Snapshot = HospitalState;

    fn beds(&self) -> Vec<Bed> {
        self.inner.beds()
    }

    fn total_beds(&self) -> usize {
        self.inner.total_beds()
    }

    fn assignments(&self) -> Vec<BedAssignment> {
        self.inner.assignments()
    }

    fn patient(&self, id: PatientId) -> Option<Patient> {
        self.inner.patient(id)
    }

    fn procedure(&self, id: ProcedureId) -> Option<MedicalProcedure> {
        self.inner.procedure(id)
    }

    fn doctor(&self, id: DoctorId) -> Option<Doctor> {
        self.inner.doctor(id)
    }

    fn list_free_beds(&self, department: Option<&Department>) -> Vec<BedId> {
        self.inner.list_free_beds(department)
    }

    fn list_queue(&self, admission_day: Option<u32>) -> Vec<QueueEntry> {
        self.inner.list_queue(admission_day)
    }

    fn queue_entry(&self, id: QueueEntryId) -> Option<QueueEntry> {
        self.inner.queue_entry(id)
    }

    fn list_assignments_at_or_below(&self, threshold: i32) -> Vec<BedAssignment> {
        self.inner.list_assignments_at_or_below(threshold)
    }

    fn decrement_stays(&mut self) {
        self.inner.decrement_stays()
    }

    fn delete_assignments_at_or_below(&mut self, threshold: i32) -> usize {
        self.release_calls += 1;
        let deleted = self.inner.delete_assignments_at_or_below(threshold);
        if self.release_calls == self.miscount_on {
            deleted + 1
        } else {
            deleted
        }
    }

    fn delete_queue_entry(&mut self, id: QueueEntryId) -> Result<QueueEntry, RepositoryError> {
        self.inner.delete_queue_entry(id)
    }

    fn create_assignment(&mut self, assignment: BedAssignment) -> Result<(), RepositoryError> {
        self.inner.create_assignment(assignment)
    }

    fn begin(&mut self) {
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<(), RepositoryError> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), RepositoryError> {
        self.inner.rollback()
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    fn snapshot(&self) -> HospitalState {
        self.inner.snapshot()
    }

    fn restore(&mut self, snapshot: HospitalState) {
        self.inner.restore(snapshot)
    }

    fn validate(&self) -> Result<(), String> {
        self.inner.validate()
    }
}

// ============================================================================
// Single-Step Rollback
// ============================================================================

#[test]
fn test_forward_then_back_is_identity() {
    let mut engine = engine_on_day(43, 4);
    let state = engine.repository().snapshot();
    let rng = engine.rng_checkpoint();
    let tables = engine.tables().unwrap();

    engine.advance(1).unwrap();
    engine.materialize().unwrap();
    assert_eq!(engine.materialized_day(), 5);

    assert_eq!(engine.advance(-1).unwrap(), 4);
    assert_eq!(engine.repository().snapshot(), state);
    assert_eq!(engine.rng_checkpoint(), rng);
    assert_eq!(engine.materialized_day(), 4);
    assert_eq!(engine.occupancy_series().len(), 4);
    assert_eq!(engine.tables().unwrap(), tables);
}

#[test]
fn test_rollback_drops_later_events() {
    let mut engine = engine_on_day(43, 6);
    engine.advance(-1).unwrap();
    engine.advance(-1).unwrap();

    assert!(engine.events().events_on_day(5).is_empty());
    assert!(engine.events().events_on_day(6).is_empty());

    // The first rollback was attributed to day 5 and went with it
    let rollbacks = engine.events().events_of_type("DayRolledBack");
    assert_eq!(rollbacks.len(), 1);
    assert_eq!(rollbacks[0], &Event::DayRolledBack { day: 4, from_day: 5 });
}

#[test]
fn test_rollback_to_day_one_restores_baseline() {
    let initial = generated_state(43);
    let mut engine = engine_on_day(43, 5);
    for _ in 0..10 {
        engine.advance(-1).unwrap();
    }

    assert_eq!(engine.current_day(), 1);
    assert_eq!(engine.repository().snapshot(), initial);
    assert_eq!(engine.checkpoints().len(), 1);
}

#[test]
fn test_replay_after_rollback_reproduces_day() {
    let mut engine = engine_on_day(43, 7);
    let day_seven = engine.tables().unwrap();

    for _ in 0..3 {
        engine.advance(-1).unwrap();
    }
    for _ in 0..3 {
        engine.advance(1).unwrap();
    }
    assert_eq!(engine.tables().unwrap(), day_seven);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_state_independent_of_path(
        seed in 1u64..1_000,
        moves in prop::collection::vec((any::<bool>(), any::<bool>()), 1..24),
    ) {
        let mut walked = engine(seed);
        for (forward, query) in moves {
            walked.advance(if forward { 1 } else { -1 }).unwrap();
            if query {
                walked.materialize().unwrap();
            }
        }
        walked.materialize().unwrap();

        let direct = engine_on_day(seed, walked.current_day());
        prop_assert_eq!(walked.repository().snapshot(), direct.repository().snapshot());
        prop_assert_eq!(walked.rng_checkpoint(), direct.rng_checkpoint());
        prop_assert_eq!(walked.occupancy_series(), direct.occupancy_series());
        prop_assert_eq!(walked.no_show_series(), direct.no_show_series());
        prop_assert_eq!(walked.average_stay_series(), direct.average_stay_series());
    }
}

// ============================================================================
// Failure Atomicity
// ============================================================================

#[test]
fn test_failed_pass_restores_pre_pass_state() {
    let repo = MiscountingRepository::new(InMemoryRepository::new(generated_state(43)), 2);
    let mut engine = SimulationEngine::new(SimulationConfig::default(), repo).unwrap();
    let state = engine.repository().snapshot();
    let rng = engine.rng_checkpoint();
    let events = engine.events().clone();

    engine.advance(1).unwrap();
    engine.advance(1).unwrap();
    let err = engine.materialize().unwrap_err();

    // Day 2 succeeded inside the pass, day 3 failed: both are undone
    assert!(matches!(err, SimulationError::TransactionFailure { day: 3, .. }));
    assert!(err.is_fatal());
    assert_eq!(engine.materialized_day(), 1);
    assert_eq!(engine.repository().snapshot(), state);
    assert_eq!(engine.rng_checkpoint(), rng);
    assert_eq!(engine.occupancy_series().len(), 1);
    assert_eq!(engine.events(), &events);
    assert!(!engine.repository().in_transaction());
    assert_eq!(engine.current_day(), 3);
}

#[test]
fn test_retry_after_failure_matches_clean_run() {
    let repo = MiscountingRepository::new(InMemoryRepository::new(generated_state(43)), 1);
    let mut engine = SimulationEngine::new(SimulationConfig::default(), repo).unwrap();

    engine.advance(1).unwrap();
    engine.advance(1).unwrap();
    assert!(engine.materialize().is_err());

    // The miscount happens once; the retry computes days 2 and 3 cleanly
    let outcome = engine.materialize().unwrap();
    assert_eq!(outcome.materialized, vec![2, 3]);

    let clean = engine_on_day(43, 3);
    assert_eq!(engine.repository().snapshot(), clean.repository().snapshot());
    assert_eq!(engine.rng_checkpoint(), clean.rng_checkpoint());
}
