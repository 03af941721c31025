//! Per-day time series
//!
//! Each series holds exactly one value per materialized day, starting at
//! day 1. Values are appended in day order and truncated on rollback. Only
//! the latest day's value may be amended, when consents are admitted on top
//! of that day.

use serde::{Deserialize, Serialize};

/// Placeholder reported instead of a number when a metric is undefined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentinel {
    /// Only one data point exists, so there is nothing to compare against
    #[serde(rename = "no previous day")]
    NoPreviousDay,
    /// No patients were due to arrive that day
    #[serde(rename = "no incoming patients")]
    NoIncomingPatients,
    /// No calls were placed that day
    #[serde(rename = "no calls")]
    NoCalls,
    /// The hospital has no beds to measure occupancy against
    #[serde(rename = "no beds")]
    NoBeds,
}

impl Sentinel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentinel::NoPreviousDay => "no previous day",
            Sentinel::NoIncomingPatients => "no incoming patients",
            Sentinel::NoCalls => "no calls",
            Sentinel::NoBeds => "no beds",
        }
    }
}

/// A metric value: either a number or a sentinel
///
/// Serializes as a bare JSON number or string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Value(f64),
    Missing(Sentinel),
}

impl MetricValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(*v),
            MetricValue::Missing(_) => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, MetricValue::Missing(_))
    }

    /// `numerator / denominator * 100`, or `sentinel` when the denominator is zero
    pub fn percentage(numerator: usize, denominator: usize, sentinel: Sentinel) -> Self {
        if denominator == 0 {
            MetricValue::Missing(sentinel)
        } else {
            MetricValue::Value(numerator as f64 / denominator as f64 * 100.0)
        }
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        MetricValue::Value(value)
    }
}

/// Append-only sequence of one value per day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    values: Vec<MetricValue>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Series holding only the day-1 value
    pub fn starting_with(initial: MetricValue) -> Self {
        Self {
            values: vec![initial],
        }
    }

    /// Record the value for `day`, which must be the next day in sequence
    pub fn record(&mut self, day: u32, value: MetricValue) -> Result<(), String> {
        let expected = self.values.len() as u32 + 1;
        if day != expected {
            return Err(format!(
                "time series expected day {}, got day {}",
                expected, day
            ));
        }
        self.values.push(value);
        Ok(())
    }

    /// Overwrite the value of `day`, which must be the latest recorded day
    pub fn amend_last(&mut self, day: u32, value: MetricValue) -> Result<(), String> {
        let last = self.last_day();
        match self.values.last_mut() {
            Some(slot) if day == last => {
                *slot = value;
                Ok(())
            }
            _ => Err(format!(
                "time series can only amend its latest day {}, got day {}",
                last, day
            )),
        }
    }

    /// Drop every value recorded for days after `day`
    pub fn truncate_after(&mut self, day: u32) {
        self.values.truncate(day as usize);
    }

    pub fn get(&self, day: u32) -> Option<MetricValue> {
        if day == 0 {
            return None;
        }
        self.values.get(day as usize - 1).copied()
    }

    pub fn last_day(&self) -> u32 {
        self.values.len() as u32
    }

    pub fn values(&self) -> &[MetricValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
