//! Voice-agent collaborator
//!
//! The phone conversation itself happens elsewhere. The simulation only
//! builds a [`NegotiationRequest`], hands it to a [`VoiceAgent`] and consumes
//! the yes/no answer.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::models::QueueEntry;
use crate::rng::RngManager;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("Call failed: {0}")]
    CallFailed(String),

    #[error("No scripted answer left for call {0}")]
    ScriptExhausted(usize),
}

/// What the agent tells the patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationRequest {
    pub patient_name: String,
    pub patient_surname: String,
    pub sickness: String,
    /// Day the patient is currently expected to come in
    pub current_visit_day: u32,
    /// Earlier day offered instead
    pub suggested_appointment_day: u32,
}

/// Black-box consent negotiation
pub trait VoiceAgent {
    /// Returns whether the patient agreed to the suggested day
    fn negotiate(&mut self, request: &NegotiationRequest) -> Result<bool, AgentError>;
}

/// Agent whose patients always agree
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConsent;

impl VoiceAgent for AlwaysConsent {
    fn negotiate(&mut self, _request: &NegotiationRequest) -> Result<bool, AgentError> {
        Ok(true)
    }
}

/// Agent whose patients always refuse
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConsent;

impl VoiceAgent for NeverConsent {
    fn negotiate(&mut self, _request: &NegotiationRequest) -> Result<bool, AgentError> {
        Ok(false)
    }
}

/// Agent replaying a fixed list of answers, recording every request
#[derive(Debug, Clone, Default)]
pub struct ScriptedAgent {
    answers: VecDeque<bool>,
    requests: Vec<NegotiationRequest>,
}

impl ScriptedAgent {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            requests: Vec::new(),
        }
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> &[NegotiationRequest] {
        &self.requests
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl VoiceAgent for ScriptedAgent {
    fn negotiate(&mut self, request: &NegotiationRequest) -> Result<bool, AgentError> {
        self.requests.push(request.clone());
        self.answers
            .pop_front()
            .ok_or(AgentError::ScriptExhausted(self.requests.len()))
    }
}

/// Days proposed to a queued patient during a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSuggestion {
    pub old_day: u32,
    pub new_day: u32,
}

/// Estimate the patient's current visit day and offer today instead
///
/// The estimate is `current_day + position / k` with `k` in `2..=4`, drawn
/// from a stream derived from the seed, day and entry. Repeating the call on
/// the same day gives the same suggestion.
pub fn suggest_call_days(seed: u64, current_day: u32, entry: &QueueEntry) -> CallSuggestion {
    let mut rng = RngManager::derived(seed, &[current_day as u64, entry.id.0 as u64]);
    let k = rng.range_inclusive(2, 4) as u32;
    CallSuggestion {
        old_day: current_day + entry.position / k,
        new_day: current_day,
    }
}
