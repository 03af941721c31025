//! Request boundary
//!
//! [`SimulationService`] serialises every request on one engine behind a
//! mutex and turns results into explicit response types. Errors never cross
//! this boundary as `SimulationError`: they are logged here and mapped to an
//! [`ErrorResponse`].

use std::backtrace::Backtrace;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::agent::VoiceAgent;
use crate::models::QueueEntryId;
use crate::orchestrator::{CallCandidate, SimulationEngine, SimulationError, Tables};
use crate::repository::BedRepository;
use crate::stats::StatisticsBlock;

/// `{day}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayResponse {
    pub day: u32,
}

/// `{status}`, HTTP-style code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: u16,
}

impl StatusResponse {
    pub const OK: StatusResponse = StatusResponse { status: 200 };
}

/// Calls placed so far on `day`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCountResponse {
    pub day: u32,
    pub calls: u32,
}

/// Result of a voice-agent call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResponse {
    pub queue_id: QueueEntryId,
    pub consent: bool,
    pub old_day: u32,
    pub new_day: u32,
}

pub type TablesResponse = Tables;

/// `{error, message?}`
///
/// Invalid input carries the reason in `error` itself, e.g.
/// `{"error": "Invalid delta value. Use -1 or 1."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub type UpdateDayResponse = Result<DayResponse, ErrorResponse>;

impl From<SimulationError> for ErrorResponse {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::InvalidInput(reason) => {
                warn!("Rejected request: {}", reason);
                ErrorResponse {
                    error: reason,
                    message: None,
                }
            }
            SimulationError::NoCapacity(reason) => {
                warn!("No capacity: {}", reason);
                ErrorResponse {
                    error: "No capacity".to_string(),
                    message: Some(reason),
                }
            }
            other => {
                let message = format!("Error occurred: {}", other);
                if other.is_fatal() {
                    error!("Engine consistency violated, this is a bug");
                }
                error!("{}\n{}", message, Backtrace::force_capture());
                ErrorResponse {
                    error: "Server Error".to_string(),
                    message: Some(message),
                }
            }
        }
    }
}

/// Shared, serialised handle over one simulation
pub struct SimulationService<R: BedRepository> {
    engine: Arc<Mutex<SimulationEngine<R>>>,
}

impl<R: BedRepository> Clone for SimulationService<R> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
        }
    }
}

impl<R: BedRepository> SimulationService<R> {
    pub fn new(engine: SimulationEngine<R>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// A panicking request cannot leave the engine mid-pass (passes restore
    /// their pre-pass state on error), so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, SimulationEngine<R>> {
        self.engine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` with exclusive access to the engine
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut SimulationEngine<R>) -> T) -> T {
        f(&mut self.lock())
    }

    pub fn get_current_day(&self) -> DayResponse {
        DayResponse {
            day: self.lock().current_day(),
        }
    }

    pub fn update_day(&self, delta: i32) -> UpdateDayResponse {
        let day = self.lock().advance(delta)?;
        Ok(DayResponse { day })
    }

    pub fn reset(&self) -> Result<DayResponse, ErrorResponse> {
        let day = self.lock().reset()?;
        Ok(DayResponse { day })
    }

    pub fn get_tables(&self) -> Result<TablesResponse, ErrorResponse> {
        Ok(self.lock().tables()?)
    }

    pub fn statistics(&self) -> Result<StatisticsBlock, ErrorResponse> {
        Ok(self.lock().statistics()?)
    }

    pub fn register_consent(&self, queue_id: u32) -> Result<StatusResponse, ErrorResponse> {
        self.lock().register_consent(QueueEntryId(queue_id))?;
        Ok(StatusResponse::OK)
    }

    pub fn increment_calls(&self) -> CallCountResponse {
        let mut engine = self.lock();
        let calls = engine.increment_calls();
        CallCountResponse {
            day: engine.current_day(),
            calls,
        }
    }

    /// Discard consents registered today and not yet applied
    pub fn rollback_session(&self) -> StatusResponse {
        self.lock().rollback_pending();
        StatusResponse::OK
    }

    pub fn call_candidate(&self) -> Result<Option<CallCandidate>, ErrorResponse> {
        Ok(self.lock().call_candidate()?)
    }

    pub fn call_patient(
        &self,
        queue_id: u32,
        agent: &mut dyn VoiceAgent,
    ) -> Result<CallResponse, ErrorResponse> {
        let outcome = self.lock().call_patient(QueueEntryId(queue_id), agent)?;
        Ok(CallResponse {
            queue_id: outcome.entry_id,
            consent: outcome.consented,
            old_day: outcome.suggestion.old_day,
            new_day: outcome.suggestion.new_day,
        })
    }
}
