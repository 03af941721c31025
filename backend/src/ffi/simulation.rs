//! PyO3 wrapper for the simulation service
//!
//! Mirrors the HTTP-style interface: every method returns a plain dict
//! (`{"day": ...}`, `{"status": 200}`, `{"error": ..., "message": ...}`),
//! and `get_tables` returns the tables view as a JSON string.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{call_count_to_py, day_to_py, error_to_py, parse_simulation_config, status_to_py};
use crate::orchestrator::{SimulationConfig, SimulationEngine};
use crate::repository::InMemoryRepository;
use crate::scenario::{GeneratorConfig, Scenario};
use crate::service::{ErrorResponse, SimulationService};

fn runtime_error(message: String) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(message)
}

/// Python handle on one hospital simulation
///
/// # Example (from Python)
///
/// ```python
/// from bed_occupancy_core import HospitalSimulation
///
/// sim = HospitalSimulation({"rng_seed": 43})
/// sim.update_day(1)          # {"day": 2}
/// tables = json.loads(sim.get_tables())
/// ```
#[pyclass(name = "HospitalSimulation")]
pub struct PyHospitalSimulation {
    inner: SimulationService<InMemoryRepository>,
}

#[pymethods]
impl PyHospitalSimulation {
    /// Create a simulation from an optional config dict and an optional
    /// scenario JSON document; without a scenario a default hospital is
    /// generated from the config seed
    ///
    /// # Errors
    ///
    /// Raises ValueError for a bad config and RuntimeError for a bad scenario
    #[new]
    #[pyo3(signature = (config=None, scenario_json=None))]
    fn new(config: Option<&Bound<'_, PyDict>>, scenario_json: Option<&str>) -> PyResult<Self> {
        let config = match config {
            Some(dict) => parse_simulation_config(dict)?,
            None => SimulationConfig::default(),
        };
        let scenario = match scenario_json {
            Some(json) => Scenario::from_json_str(json).map_err(|e| runtime_error(e.to_string()))?,
            None => Scenario::generate(&GeneratorConfig::default(), config.rng_seed),
        };
        let state = scenario
            .into_state()
            .map_err(|e| runtime_error(e.to_string()))?;
        let engine = SimulationEngine::new(config, InMemoryRepository::new(state))
            .map_err(|e| runtime_error(format!("Failed to create simulation: {}", e)))?;

        Ok(Self {
            inner: SimulationService::new(engine),
        })
    }

    fn get_current_day(&self, py: Python) -> PyResult<Py<PyDict>> {
        day_to_py(py, self.inner.get_current_day())
    }

    /// Move one day forward (`1`) or back (`-1`)
    fn update_day(&self, py: Python, delta: i32) -> PyResult<Py<PyDict>> {
        match self.inner.update_day(delta) {
            Ok(day) => day_to_py(py, day),
            Err(err) => error_to_py(py, &err),
        }
    }

    fn reset(&self, py: Python) -> PyResult<Py<PyDict>> {
        match self.inner.reset() {
            Ok(day) => day_to_py(py, day),
            Err(err) => error_to_py(py, &err),
        }
    }

    /// Beds, queue, no-shows and statistics as JSON
    fn get_tables(&self) -> PyResult<String> {
        let json = match self.inner.get_tables() {
            Ok(tables) => serde_json::to_string(&tables),
            Err(err) => serde_json::to_string(&err),
        };
        json.map_err(|e| runtime_error(format!("Tables serialization failed: {}", e)))
    }

    fn register_consent(&self, py: Python, queue_id: u32) -> PyResult<Py<PyDict>> {
        match self.inner.register_consent(queue_id) {
            Ok(status) => status_to_py(py, status),
            Err(err) => error_to_py(py, &err),
        }
    }

    fn increment_calls(&self, py: Python) -> PyResult<Py<PyDict>> {
        call_count_to_py(py, self.inner.increment_calls())
    }

    /// Discard consents registered today that were not applied yet
    fn rollback_session(&self, py: Python) -> PyResult<Py<PyDict>> {
        status_to_py(py, self.inner.rollback_session())
    }

    /// First queued patient to call, as JSON (`null` when no bed is free)
    fn get_call_candidate(&self) -> PyResult<String> {
        let result: Result<String, serde_json::Error> = match self.inner.call_candidate() {
            Ok(candidate) => serde_json::to_string(&candidate),
            Err(err) => serde_json::to_string::<ErrorResponse>(&err),
        };
        result.map_err(|e| runtime_error(format!("Candidate serialization failed: {}", e)))
    }
}
