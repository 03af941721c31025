//! Day Advance Tests
//!
//! Critical invariants tested:
//! - A day transition runs release, then no-show draws and admissions
//! - Department pools never place a patient outside their procedure's ward
//! - Outcomes follow the seeded stream draw for draw
//! - The clock stays within `1..=max_day`, and only ±1 moves are accepted
//! - Day 1 has no no-show rate and no deltas

use bed_occupancy_core::core::Direction;
use bed_occupancy_core::models::{
    Bed, BedAssignment, BedId, Department, HospitalState, MedicalProcedure, MetricValue,
    NewQueueEntry, Patient, PatientId, ProcedureId, Sentinel,
};
use bed_occupancy_core::orchestrator::{
    AdmissionMode, BedPoolMode, NoShowWeights, SimulationConfig, SimulationEngine,
    SimulationError,
};
use bed_occupancy_core::repository::{BedRepository, InMemoryRepository};
use bed_occupancy_core::RngManager;

// ============================================================================
// Test Helpers
// ============================================================================

fn patient(id: u32, procedure: Option<u32>) -> Patient {
    Patient {
        id: PatientId(id),
        first_name: format!("Jan{}", id),
        last_name: "Topolewski".to_string(),
        pesel: format!("8001011{:04}", id),
        urgency: Some("medium".to_string()),
        contact_phone: None,
        gender: None,
        nationality: None,
        sickness: "zapalenie kolana".to_string(),
        procedure: procedure.map(ProcedureId),
    }
}

fn queued(patient: u32, requested_admission_day: Option<u32>) -> NewQueueEntry {
    NewQueueEntry {
        patient_id: PatientId(patient),
        procedure: None,
        requested_admission_day,
        expected_days_of_stay: None,
    }
}

fn shared_beds(count: u32) -> Vec<Bed> {
    (1..=count).map(|id| Bed { id: BedId(id), department: None }).collect()
}

/// One bed occupied by patient 2 for one more day, patient 1 queued
fn one_bed_hospital() -> HospitalState {
    let mut state = HospitalState::new(
        shared_beds(1),
        vec![patient(1, None), patient(2, None)],
        vec![],
        vec![],
    );
    state
        .assign(BedAssignment::new(BedId(1), PatientId(2), None, 1))
        .unwrap();
    state.queue_mut().push(queued(1, None));
    state
}

fn engine_with(config: SimulationConfig, state: HospitalState) -> SimulationEngine<InMemoryRepository> {
    SimulationEngine::new(config, InMemoryRepository::new(state)).unwrap()
}

/// Replays the first draws of a fresh seed-43 stream: arrival, then stay
fn expected_first_draws(weights: NoShowWeights) -> (bool, i32) {
    let config = SimulationConfig::default();
    let mut rng = RngManager::new(config.rng_seed);
    let arrives = rng.weighted_bool(weights.arrive, weights.no_show);
    let stay = rng.range_inclusive(config.stay_length.min as i64, config.stay_length.max as i64);
    (arrives, stay as i32)
}

// ============================================================================
// Seeded Single-Bed Scenario
// ============================================================================

#[test]
fn test_single_bed_follows_seeded_draw() {
    let mut engine = engine_with(SimulationConfig::default(), one_bed_hospital());
    engine.advance(1).unwrap();
    let tables = engine.tables().unwrap();

    let (arrives, stay) = expected_first_draws(NoShowWeights::default());
    assert_eq!(tables.day, 2);
    assert!(tables.queue.is_empty());

    if arrives {
        assert_eq!(tables.beds[0].patient_id, Some(PatientId(1)));
        assert_eq!(tables.beds[0].days_of_stay, stay);
        assert!(tables.no_shows.is_empty());
        assert_eq!(tables.statistics.no_shows.current, MetricValue::Value(0.0));
        assert_eq!(tables.statistics.occupancy.current, MetricValue::Value(100.0));
    } else {
        assert_eq!(tables.beds[0].patient_id, None);
        assert_eq!(tables.no_shows.len(), 1);
        assert_eq!(tables.no_shows[0].patient_name, "Jan1 Topolewski");
        assert_eq!(tables.statistics.no_shows.current, MetricValue::Value(100.0));
        assert_eq!(tables.statistics.occupancy.current, MetricValue::Value(0.0));
    }
}

#[test]
fn test_single_bed_admission_day_mode_same_draw() {
    let mut state = HospitalState::new(shared_beds(1), vec![patient(1, None)], vec![], vec![]);
    state.queue_mut().push(queued(1, Some(2)));
    let config = SimulationConfig {
        admission_mode: AdmissionMode::AdmissionDay,
        ..SimulationConfig::default()
    };
    let mut engine = engine_with(config, state);
    engine.advance(1).unwrap();
    engine.materialize().unwrap();

    let (arrives, stay) = expected_first_draws(NoShowWeights::default());
    let repo = engine.repository();
    assert!(repo.list_queue(None).is_empty());
    if arrives {
        let assignments = repo.assignments();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].patient_id, PatientId(1));
        assert_eq!(assignments[0].days_of_stay, stay);
    } else {
        assert!(repo.assignments().is_empty());
        assert_eq!(engine.events().events_of_type("NoShow").len(), 1);
    }
}

#[test]
fn test_booking_for_later_day_not_drawn_early() {
    let mut state = HospitalState::new(shared_beds(1), vec![patient(1, None)], vec![], vec![]);
    state.queue_mut().push(queued(1, Some(4)));
    let config = SimulationConfig {
        admission_mode: AdmissionMode::AdmissionDay,
        ..SimulationConfig::default()
    };
    let mut engine = engine_with(config, state);
    let start = engine.rng_checkpoint();

    engine.advance(1).unwrap();
    engine.advance(1).unwrap();
    let tables = engine.tables().unwrap();

    assert_eq!(tables.queue.len(), 1);
    assert_eq!(engine.rng_checkpoint(), start);
    assert_eq!(
        tables.statistics.no_shows.current,
        MetricValue::Missing(Sentinel::NoIncomingPatients)
    );
}

// ============================================================================
// Release
// ============================================================================

#[test]
fn test_stays_decrement_once_per_day() {
    let mut state = HospitalState::new(shared_beds(2), vec![patient(1, None)], vec![], vec![]);
    state
        .assign(BedAssignment::new(BedId(1), PatientId(1), None, 5))
        .unwrap();
    let mut engine = engine_with(SimulationConfig::default(), state);

    for expected in [4, 3, 2] {
        engine.advance(1).unwrap();
        let tables = engine.tables().unwrap();
        assert_eq!(tables.beds[0].days_of_stay, expected);
    }
}

#[test]
fn test_release_at_zero_by_default() {
    let mut state = HospitalState::new(shared_beds(1), vec![patient(1, None)], vec![], vec![]);
    state
        .assign(BedAssignment::new(BedId(1), PatientId(1), None, 2))
        .unwrap();
    let mut engine = engine_with(SimulationConfig::default(), state);

    engine.advance(1).unwrap();
    engine.materialize().unwrap();
    assert_eq!(engine.repository().assignments().len(), 1);

    engine.advance(1).unwrap();
    engine.materialize().unwrap();
    assert!(engine.repository().assignments().is_empty());
    assert_eq!(engine.events().events_of_type("PatientReleased").len(), 1);
}

#[test]
fn test_release_threshold_one_frees_a_day_earlier() {
    let mut state = HospitalState::new(shared_beds(1), vec![patient(1, None)], vec![], vec![]);
    state
        .assign(BedAssignment::new(BedId(1), PatientId(1), None, 2))
        .unwrap();
    let config = SimulationConfig {
        release_threshold: 1,
        ..SimulationConfig::default()
    };
    let mut engine = engine_with(config, state);

    engine.advance(1).unwrap();
    engine.materialize().unwrap();
    assert!(engine.repository().assignments().is_empty());
}

#[test]
fn test_no_release_means_no_draws() {
    // Released-slots mode: nothing freed, nobody drawn, even with a free bed
    let mut state = HospitalState::new(shared_beds(2), vec![patient(1, None), patient(2, None)], vec![], vec![]);
    state
        .assign(BedAssignment::new(BedId(1), PatientId(2), None, 9))
        .unwrap();
    state.queue_mut().push(queued(1, None));
    let mut engine = engine_with(SimulationConfig::default(), state);
    let start = engine.rng_checkpoint();

    engine.advance(1).unwrap();
    let tables = engine.tables().unwrap();

    assert_eq!(tables.queue.len(), 1);
    assert_eq!(engine.rng_checkpoint(), start);
    assert_eq!(
        tables.statistics.no_shows.current,
        MetricValue::Missing(Sentinel::NoIncomingPatients)
    );
}

// ============================================================================
// Department Pools
// ============================================================================

#[test]
fn test_department_pool_keeps_patient_out_of_other_wards() {
    let cardiology = Department::new("Cardiology");
    let beds = vec![Bed { id: BedId(1), department: Some(Department::new("Orthopedics")) }];
    let procedures = vec![MedicalProcedure {
        id: ProcedureId(1),
        name: "Coronary angioplasty".to_string(),
        department: cardiology,
        doctor: None,
    }];
    let mut state = HospitalState::new(beds, vec![patient(1, Some(1))], procedures, vec![]);
    state.queue_mut().push(queued(1, Some(2)));
    let config = SimulationConfig {
        admission_mode: AdmissionMode::AdmissionDay,
        bed_pools: BedPoolMode::ByDepartment,
        ..SimulationConfig::default()
    };
    let mut engine = engine_with(config, state);
    let start = engine.rng_checkpoint();

    engine.advance(1).unwrap();
    let tables = engine.tables().unwrap();

    // No cardiology bed: skipped without a draw, still queued
    assert_eq!(tables.queue.len(), 1);
    assert_eq!(tables.queue[0].department.as_deref(), Some("Cardiology"));
    assert!(tables.beds[0].patient_id.is_none());
    assert_eq!(engine.rng_checkpoint(), start);
}

fn department_pools() -> SimulationConfig {
    SimulationConfig {
        admission_mode: AdmissionMode::AdmissionDay,
        bed_pools: BedPoolMode::ByDepartment,
        ..SimulationConfig::default()
    }
}

/// One free cardiology bed, patient 1 queued for day 2 with no procedure
fn ward_without_procedure() -> HospitalState {
    let beds = vec![Bed { id: BedId(1), department: Some(Department::new("Cardiology")) }];
    let mut state = HospitalState::new(beds, vec![patient(1, None)], vec![], vec![]);
    state.queue_mut().push(queued(1, Some(2)));
    state
}

#[test]
fn test_department_pool_skips_entry_without_procedure() {
    let mut engine = engine_with(department_pools(), ward_without_procedure());
    let start = engine.rng_checkpoint();

    engine.advance(1).unwrap();
    let tables = engine.tables().unwrap();

    assert_eq!(tables.queue.len(), 1);
    assert_eq!(tables.queue[0].patient_id, PatientId(1));
    assert!(tables.beds[0].patient_id.is_none());
    assert!(tables.no_shows.is_empty());
    assert_eq!(engine.rng_checkpoint(), start);
}

#[test]
fn test_department_pool_rejects_consent_without_procedure() {
    let mut engine = engine_with(department_pools(), ward_without_procedure());
    let entry = engine.tables().unwrap().queue[0].entry_id;

    let err = engine.register_consent(entry).unwrap_err();
    assert!(matches!(err, SimulationError::InvalidInput(_)));
    assert!(!engine.consents().has_pending(1));
    assert!(engine.call_candidate().unwrap().is_none());

    // Shared pool admits the same patient
    let mut shared = engine_with(SimulationConfig::default(), ward_without_procedure());
    shared.register_consent(entry).unwrap();
    assert_eq!(shared.tables().unwrap().beds[0].patient_id, Some(PatientId(1)));
}

// ============================================================================
// Clock
// ============================================================================

#[test]
fn test_day_one_statistics_are_sentinels() {
    let mut engine = engine_with(SimulationConfig::default(), one_bed_hospital());
    let tables = engine.tables().unwrap();
    let no_previous = MetricValue::Missing(Sentinel::NoPreviousDay);

    assert_eq!(tables.day, 1);
    assert_eq!(tables.statistics.occupancy.current, MetricValue::Value(100.0));
    assert_eq!(tables.statistics.occupancy.delta, no_previous);
    assert_eq!(tables.statistics.occupancy.average_delta, no_previous);
    assert_eq!(
        tables.statistics.no_shows.current,
        MetricValue::Missing(Sentinel::NoIncomingPatients)
    );
    assert_eq!(
        tables.statistics.consents.current,
        MetricValue::Missing(Sentinel::NoCalls)
    );
}

#[test]
fn test_invalid_delta_rejected_without_moving() {
    let mut engine = engine_with(SimulationConfig::default(), one_bed_hospital());
    for delta in [0, 2, -2, 7] {
        let err = engine.advance(delta).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidInput(ref m) if m == "Invalid delta value. Use -1 or 1."));
    }
    assert_eq!(engine.current_day(), 1);
}

#[test]
fn test_clock_saturates_at_bounds() {
    let config = SimulationConfig {
        max_day: 3,
        ..SimulationConfig::default()
    };
    let mut engine = engine_with(config, one_bed_hospital());

    assert_eq!(engine.advance(-1).unwrap(), 1);
    assert_eq!(engine.advance(1).unwrap(), 2);
    assert_eq!(engine.advance(1).unwrap(), 3);
    assert_eq!(engine.advance(1).unwrap(), 3);
    assert_eq!(engine.last_direction(), Direction::Forward);

    engine.materialize().unwrap();
    assert_eq!(engine.materialized_day(), 3);
}

#[test]
fn test_forward_move_is_lazy() {
    let mut engine = engine_with(SimulationConfig::default(), one_bed_hospital());
    engine.advance(1).unwrap();
    engine.advance(1).unwrap();
    assert_eq!(engine.materialized_day(), 1);

    let outcome = engine.materialize().unwrap();
    assert_eq!(outcome.materialized, vec![2, 3]);
    assert!(!outcome.interrupted);
    assert_eq!(engine.occupancy_series().len(), 3);
}

#[test]
fn test_series_one_value_per_day() {
    let mut engine = engine_with(SimulationConfig::default(), one_bed_hospital());
    for _ in 0..5 {
        engine.advance(1).unwrap();
    }
    engine.tables().unwrap();

    assert_eq!(engine.occupancy_series().len(), 6);
    assert_eq!(engine.average_stay_series().len(), 6);
    assert_eq!(engine.no_show_series().len(), 6);
    assert_eq!(engine.checkpoints().len(), 6);
}
