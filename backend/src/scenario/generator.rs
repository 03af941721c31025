//! Deterministic scenario generator
//!
//! Same config and seed, same hospital. Names and diagnoses come from small
//! fixed lists; PESEL numbers are well-formed (valid check digit) and unique.

use serde::{Deserialize, Serialize};

use crate::models::{
    Bed, BedAssignment, BedId, Department, Doctor, DoctorId, MedicalProcedure, NewQueueEntry,
    Patient, PatientId, ProcedureId,
};
use crate::orchestrator::StayRange;
use crate::rng::RngManager;
use crate::scenario::Scenario;

const FIRST_NAMES: &[&str] = &[
    "Anna", "Piotr", "Maria", "Krzysztof", "Katarzyna", "Tomasz", "Agnieszka", "Paweł",
    "Magdalena", "Michał", "Joanna", "Marcin", "Ewa", "Jakub", "Zofia", "Adam",
];

const LAST_NAMES: &[&str] = &[
    "Nowak", "Kowalski", "Wiśniewski", "Wójcik", "Kamiński", "Lewandowski", "Zieliński",
    "Szymański", "Woźniak", "Dąbrowski", "Kozłowski", "Jankowski",
];

/// Department name, then (procedure, diagnosis) pairs
const DEPARTMENTS: &[(&str, &[(&str, &str)])] = &[
    ("Cardiology", &[("Coronary angioplasty", "angina"), ("Pacemaker implantation", "arrhythmia")]),
    ("Orthopedics", &[("Hip replacement", "hip osteoarthritis"), ("Knee arthroscopy", "meniscus tear")]),
    ("Neurology", &[("Lumbar puncture", "meningitis"), ("EEG monitoring", "epilepsy")]),
    ("General Surgery", &[("Appendectomy", "appendicitis"), ("Cholecystectomy", "gallstones")]),
];

const URGENCY: &[&str] = &["low", "medium", "high"];

/// Size and shape of a generated hospital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub beds: u32,
    pub patients: u32,
    /// Fraction of beds occupied on day 1, `0.0..=1.0`
    pub initial_occupancy: f64,
    /// Number of departments used, from the built-in list
    pub departments: usize,
    /// When set, queued patients are booked for a day in `2..=horizon`
    pub admission_horizon: Option<u32>,
    pub stay_length: StayRange,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            beds: 10,
            patients: 30,
            initial_occupancy: 0.6,
            departments: DEPARTMENTS.len(),
            admission_horizon: None,
            stay_length: StayRange::default(),
        }
    }
}

impl Scenario {
    /// Generate a hospital from `config` and `seed`
    ///
    /// Beds are spread round-robin over the departments. The first patients
    /// fill the initially occupied beds; everyone else is queued.
    pub fn generate(config: &GeneratorConfig, seed: u64) -> Scenario {
        let mut rng = RngManager::new(seed);
        let departments = &DEPARTMENTS[..config.departments.clamp(1, DEPARTMENTS.len())];

        // (department, procedure, diagnosis), procedure ids follow this order
        let catalog: Vec<(&str, &str, &str)> = departments
            .iter()
            .flat_map(|(department, list)| {
                list.iter()
                    .map(move |(procedure, sickness)| (*department, *procedure, *sickness))
            })
            .collect();

        let mut doctors = Vec::new();
        let mut procedures = Vec::new();
        for (i, (department, name, _)) in catalog.iter().enumerate() {
            let id = i as u32 + 1;
            doctors.push(Doctor {
                id: DoctorId(id),
                first_name: pick(&mut rng, FIRST_NAMES).to_string(),
                last_name: pick(&mut rng, LAST_NAMES).to_string(),
            });
            procedures.push(MedicalProcedure {
                id: ProcedureId(id),
                name: name.to_string(),
                department: Department::new(*department),
                doctor: Some(DoctorId(id)),
            });
        }

        let beds: Vec<Bed> = (1..=config.beds)
            .map(|id| Bed {
                id: BedId(id),
                department: Some(Department::new(
                    departments[(id as usize - 1) % departments.len()].0,
                )),
            })
            .collect();

        let patients: Vec<Patient> = (1..=config.patients)
            .map(|id| {
                let procedure_index = rng.range(0, catalog.len() as i64) as usize;
                Patient {
                    id: PatientId(id),
                    first_name: pick(&mut rng, FIRST_NAMES).to_string(),
                    last_name: pick(&mut rng, LAST_NAMES).to_string(),
                    pesel: pesel(&mut rng, id),
                    urgency: Some(pick(&mut rng, URGENCY).to_string()),
                    contact_phone: Some(format!("+48 {:09}", rng.range(500_000_000, 900_000_000))),
                    gender: Some(if rng.weighted_bool(1, 1) { "F" } else { "M" }.to_string()),
                    nationality: Some("Polish".to_string()),
                    sickness: catalog[procedure_index].2.to_string(),
                    procedure: Some(procedures[procedure_index].id),
                }
            })
            .collect();

        let occupied = ((config.beds as f64 * config.initial_occupancy.clamp(0.0, 1.0)).round()
            as usize)
            .min(patients.len());

        // Occupy beds of the patient's own department where possible
        let mut assignments = Vec::new();
        let mut free: Vec<&Bed> = beds.iter().collect();
        let mut admitted = Vec::new();
        for patient in &patients {
            if assignments.len() == occupied {
                break;
            }
            let department = patient
                .procedure
                .and_then(|id| procedures.iter().find(|p| p.id == id))
                .map(|p| &p.department);
            let slot = free
                .iter()
                .position(|bed| bed.department.as_ref() == department)
                .unwrap_or(0);
            let bed = free.remove(slot);
            let days = rng.range_inclusive(config.stay_length.min as i64, config.stay_length.max as i64);
            assignments.push(BedAssignment::new(bed.id, patient.id, patient.procedure, days as i32));
            admitted.push(patient.id);
        }

        let queue = patients
            .iter()
            .filter(|p| !admitted.contains(&p.id))
            .map(|p| NewQueueEntry {
                patient_id: p.id,
                procedure: p.procedure,
                requested_admission_day: config
                    .admission_horizon
                    .map(|horizon| rng.range_inclusive(2, horizon.max(2) as i64) as u32),
                expected_days_of_stay: None,
            })
            .collect();

        Scenario {
            doctors,
            procedures,
            beds,
            patients,
            queue,
            assignments,
        }
    }
}

fn pick<'a>(rng: &mut RngManager, list: &[&'a str]) -> &'a str {
    list[rng.range(0, list.len() as i64) as usize]
}

/// An 11-digit PESEL with a valid check digit; the serial encodes `id`
fn pesel(rng: &mut RngManager, id: u32) -> String {
    let year = rng.range(40, 100);
    let month = rng.range(1, 13);
    let day = rng.range(1, 29);
    let body = format!("{:02}{:02}{:02}{:04}", year, month, day, id % 10_000);

    const WEIGHTS: [u32; 10] = [1, 3, 7, 9, 1, 3, 7, 9, 1, 3];
    let sum: u32 = body
        .chars()
        .zip(WEIGHTS)
        .map(|(c, w)| c.to_digit(10).unwrap_or(0) * w)
        .sum();
    format!("{}{}", body, (10 - sum % 10) % 10)
}
