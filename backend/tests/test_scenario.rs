//! Scenario Tests
//!
//! Critical invariants tested:
//! - Scenario files load into a valid hospital or fail with `InvalidConfig`
//! - Generated hospitals are deterministic and start in a valid state
//! - A config file overrides only the keys it names

use bed_occupancy_core::models::{BedId, PatientId};
use bed_occupancy_core::orchestrator::{
    AdmissionMode, BedPoolMode, SimulationConfig, SimulationEngine, SimulationError,
};
use bed_occupancy_core::repository::{BedRepository, InMemoryRepository};
use bed_occupancy_core::{GeneratorConfig, Scenario};

const WARD: &str = r#"{
    "doctors": [{"id": 1, "first_name": "Adam", "last_name": "Mazur"}],
    "procedures": [
        {"id": 1, "name": "Knee arthroscopy", "department": "Orthopedics", "doctor": 1}
    ],
    "beds": [
        {"id": 1, "department": "Orthopedics"},
        {"id": 2, "department": "Orthopedics"}
    ],
    "patients": [
        {"id": 1, "first_name": "Jan", "last_name": "Topolewski", "pesel": "80010112345",
         "sickness": "zapalenie kolana", "procedure": 1, "urgency": "high"},
        {"id": 2, "first_name": "Zofia", "last_name": "Krawczyk", "pesel": "91121254321",
         "sickness": "meniscus tear", "procedure": 1}
    ],
    "queue": [{"patient_id": 2, "procedure": 1, "requested_admission_day": 3}],
    "assignments": [{"bed_id": 1, "patient_id": 1, "procedure": 1, "days_of_stay": 4}]
}"#;

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_ward_scenario_tables() {
    let state = Scenario::from_json_str(WARD).unwrap().into_state().unwrap();
    let mut engine =
        SimulationEngine::new(SimulationConfig::extended(), InMemoryRepository::new(state)).unwrap();
    let tables = engine.tables().unwrap();

    let bed = &tables.beds[0];
    assert_eq!(bed.bed_id, BedId(1));
    assert_eq!(bed.patient_id, Some(PatientId(1)));
    assert_eq!(bed.pesel.as_deref(), Some("80010112345"));
    assert_eq!(bed.procedure.as_deref(), Some("Knee arthroscopy"));
    assert_eq!(bed.doctor.as_deref(), Some("Adam Mazur"));
    assert_eq!(bed.department.as_deref(), Some("Orthopedics"));

    let row = &tables.queue[0];
    assert_eq!(row.pesel, "...321");
    assert_eq!(row.department.as_deref(), Some("Orthopedics"));
    assert_eq!(row.requested_admission_day, Some(3));
}

#[test]
fn test_unknown_doctor_rejected() {
    let json = WARD.replace(r#""doctor": 1"#, r#""doctor": 7"#);
    let err = Scenario::from_json_str(&json).unwrap().into_state().unwrap_err();
    assert!(matches!(err, SimulationError::InvalidConfig(_)));
}

#[test]
fn test_double_booked_bed_rejected() {
    let json = WARD.replace(
        r#""assignments": [{"bed_id": 1, "patient_id": 1, "procedure": 1, "days_of_stay": 4}]"#,
        r#""assignments": [
            {"bed_id": 1, "patient_id": 1, "procedure": 1, "days_of_stay": 4},
            {"bed_id": 1, "patient_id": 2, "procedure": 1, "days_of_stay": 2}
        ]"#,
    );
    let err = Scenario::from_json_str(&json).unwrap().into_state().unwrap_err();
    assert!(matches!(err, SimulationError::InvalidConfig(_)));
}

#[test]
fn test_malformed_scenario_rejected() {
    let err = Scenario::from_json_str("{\"beds\": 3}").unwrap_err();
    assert!(matches!(err, SimulationError::InvalidConfig(_)));
}

#[test]
fn test_scenario_json_round_trip_builds_same_state() {
    let scenario = Scenario::generate(&GeneratorConfig::default(), 43);
    let reloaded = Scenario::from_json_str(&scenario.to_json().unwrap()).unwrap();
    assert_eq!(
        reloaded.into_state().unwrap(),
        scenario.into_state().unwrap()
    );
}

// ============================================================================
// Generator
// ============================================================================

#[test]
fn test_generator_fills_requested_occupancy() {
    let config = GeneratorConfig {
        beds: 20,
        patients: 50,
        initial_occupancy: 0.25,
        ..GeneratorConfig::default()
    };
    let state = Scenario::generate(&config, 1).into_state().unwrap();

    assert_eq!(state.total_beds(), 20);
    assert_eq!(state.occupied_beds(), 5);
    assert_eq!(state.queue().len(), 45);
    assert!(state.validate().is_ok());
}

#[test]
fn test_generator_more_beds_than_patients() {
    let config = GeneratorConfig {
        beds: 10,
        patients: 3,
        initial_occupancy: 1.0,
        ..GeneratorConfig::default()
    };
    let state = Scenario::generate(&config, 2).into_state().unwrap();

    assert_eq!(state.occupied_beds(), 3);
    assert!(state.queue().is_empty());
}

#[test]
fn test_generated_pesels_unique() {
    let scenario = Scenario::generate(&GeneratorConfig::default(), 9);
    let mut pesels: Vec<&str> = scenario.patients.iter().map(|p| p.pesel.as_str()).collect();
    pesels.sort_unstable();
    pesels.dedup();
    assert_eq!(pesels.len(), scenario.patients.len());
}

#[test]
fn test_generated_hospital_runs_full_horizon() {
    let config = GeneratorConfig {
        admission_horizon: Some(20),
        ..GeneratorConfig::default()
    };
    let state = Scenario::generate(&config, 43).into_state().unwrap();
    let mut engine =
        SimulationEngine::new(SimulationConfig::extended(), InMemoryRepository::new(state)).unwrap();
    for _ in 0..30 {
        engine.advance(1).unwrap();
    }
    let outcome = engine.materialize().unwrap();

    assert_eq!(outcome.day, 20);
    assert_eq!(outcome.materialized.len(), 19);
    assert!(engine.repository().validate().is_ok());
}

// ============================================================================
// Config Files
// ============================================================================

#[test]
fn test_partial_config_keeps_defaults() {
    let config = SimulationConfig::from_json_str(
        r#"{"rng_seed": 7, "admission_mode": "admission_day", "bed_pools": "by_department"}"#,
    )
    .unwrap();

    assert_eq!(config.rng_seed, 7);
    assert_eq!(config.admission_mode, AdmissionMode::AdmissionDay);
    assert_eq!(config.bed_pools, BedPoolMode::ByDepartment);
    assert_eq!(config.max_day, SimulationConfig::default().max_day);
    assert_eq!(config.no_show_weights, SimulationConfig::default().no_show_weights);
}

#[test]
fn test_zero_weight_config_rejected() {
    let err = SimulationConfig::from_json_str(r#"{"no_show_weights": {"arrive": 0, "no_show": 1}}"#)
        .unwrap_err();
    assert!(matches!(err, SimulationError::InvalidConfig(_)));
}
