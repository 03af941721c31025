//! Type conversion utilities for FFI boundary
//!
//! Converts between Rust response types and Python dicts.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::orchestrator::{AdmissionMode, BedPoolMode, NoShowWeights, SimulationConfig, StayRange};
use crate::service::{CallCountResponse, DayResponse, ErrorResponse, StatusResponse};

// ========================================================================
// PyDict Extraction Helpers
// ========================================================================

/// Extract an optional field; errors only when the value has the wrong type
fn extract_optional<T>(dict: &Bound<'_, PyDict>, key: &str) -> PyResult<Option<T>>
where
    T: for<'py> FromPyObject<'py>,
{
    match dict.get_item(key)? {
        Some(value) if !value.is_none() => Ok(Some(value.extract()?)),
        _ => Ok(None),
    }
}

fn value_error(message: impl Into<String>) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyValueError, _>(message.into())
}

/// Build a [`SimulationConfig`] from a Python dict; missing keys keep their
/// defaults
///
/// Weights and stay lengths are `(a, b)` tuples.
pub fn parse_simulation_config(py_config: &Bound<'_, PyDict>) -> PyResult<SimulationConfig> {
    let mut config = SimulationConfig::default();

    if let Some(seed) = extract_optional::<u64>(py_config, "rng_seed")? {
        config.rng_seed = seed;
    }
    if let Some(max_day) = extract_optional::<u32>(py_config, "max_day")? {
        config.max_day = max_day;
    }
    if let Some((arrive, no_show)) = extract_optional::<(u32, u32)>(py_config, "no_show_weights")? {
        config.no_show_weights = NoShowWeights { arrive, no_show };
    }
    if let Some((min, max)) = extract_optional::<(i32, i32)>(py_config, "stay_length")? {
        config.stay_length = StayRange { min, max };
    }
    if let Some(threshold) = extract_optional::<i32>(py_config, "release_threshold")? {
        config.release_threshold = threshold;
    }
    if let Some(mode) = extract_optional::<String>(py_config, "admission_mode")? {
        config.admission_mode = match mode.as_str() {
            "released_slots" => AdmissionMode::ReleasedSlots,
            "admission_day" => AdmissionMode::AdmissionDay,
            other => return Err(value_error(format!("Unknown admission_mode '{}'", other))),
        };
    }
    if let Some(pools) = extract_optional::<String>(py_config, "bed_pools")? {
        config.bed_pools = match pools.as_str() {
            "shared" => BedPoolMode::Shared,
            "by_department" => BedPoolMode::ByDepartment,
            other => return Err(value_error(format!("Unknown bed_pools '{}'", other))),
        };
    }

    config.validate().map_err(|e| value_error(e.to_string()))?;
    Ok(config)
}

// ========================================================================
// Response Conversion
// ========================================================================

pub fn day_to_py(py: Python, response: DayResponse) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("day", response.day)?;
    Ok(dict.unbind())
}

pub fn status_to_py(py: Python, response: StatusResponse) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("status", response.status)?;
    Ok(dict.unbind())
}

pub fn call_count_to_py(py: Python, response: CallCountResponse) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("day", response.day)?;
    dict.set_item("calls", response.calls)?;
    Ok(dict.unbind())
}

pub fn error_to_py(py: Python, response: &ErrorResponse) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("error", &response.error)?;
    if let Some(message) = &response.message {
        dict.set_item("message", message)?;
    }
    Ok(dict.unbind())
}
