//! Patients, procedures, departments and the doctors who run them
//!
//! Patients are immutable once created. A patient's procedure decides which
//! department's beds they may occupy when the simulation runs with
//! department-scoped bed pools.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable patient identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(pub u32);

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable medical procedure identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcedureId(pub u32);

/// Stable doctor identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DoctorId(pub u32);

/// Hospital department (ward). Beds and procedures belong to one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Department(pub String);

impl Department {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Doctor responsible for a procedure ("assigned personnel" in the tables view)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub first_name: String,
    pub last_name: String,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A medical procedure performed in one department by one doctor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalProcedure {
    pub id: ProcedureId,
    pub name: String,
    pub department: Department,
    pub doctor: Option<DoctorId>,
}

/// Patient identity and static attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub first_name: String,
    pub last_name: String,
    /// National identification number
    pub pesel: String,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    /// Free-text diagnosis
    pub sickness: String,
    #[serde(default)]
    pub procedure: Option<ProcedureId>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// PESEL reduced to its last three digits, e.g. `...123`
    pub fn masked_pesel(&self) -> String {
        let chars: Vec<char> = self.pesel.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(pesel: &str) -> Patient {
        Patient {
            id: PatientId(1),
            first_name: "Jan".to_string(),
            last_name: "Topolewski".to_string(),
            pesel: pesel.to_string(),
            urgency: None,
            contact_phone: None,
            gender: None,
            nationality: None,
            sickness: "zapalenie kolana".to_string(),
            procedure: None,
        }
    }

    #[test]
    fn test_masked_pesel_keeps_last_three() {
        assert_eq!(patient("90010112345").masked_pesel(), "...345");
    }

    #[test]
    fn test_masked_pesel_short_value() {
        assert_eq!(patient("12").masked_pesel(), "...12");
    }

    #[test]
    fn test_full_name() {
        assert_eq!(patient("1").full_name(), "Jan Topolewski");
    }
}
