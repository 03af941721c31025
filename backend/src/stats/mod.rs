//! Statistics aggregator
//!
//! Pure functions over the per-day series kept by the engine. Each metric
//! reports its value on the current day, the change from the previous day,
//! the running average over all days and the change of that average.
//! Undefined values are reported as sentinels, never as errors.

use serde::{Deserialize, Serialize};

use crate::models::{ConsentRegistry, MetricValue, Sentinel, TimeSeries};

/// Point-in-time and trend values of one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    pub current: MetricValue,
    pub delta: MetricValue,
    pub average: MetricValue,
    pub average_delta: MetricValue,
}

/// The statistics block returned with the tables
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticsBlock {
    /// Occupied beds, percent of all beds
    pub occupancy: MetricStatistics,
    /// Mean remaining stay of admitted patients, in days
    pub average_stay: MetricStatistics,
    /// No-shows, percent of expected arrivals
    pub no_shows: MetricStatistics,
    /// Consents, percent of calls placed
    pub consents: MetricStatistics,
}

impl StatisticsBlock {
    pub fn compute(
        occupancy: &TimeSeries,
        average_stay: &TimeSeries,
        no_shows: &TimeSeries,
        consents: &[MetricValue],
    ) -> Self {
        Self {
            occupancy: metric_statistics(occupancy.values()),
            average_stay: metric_statistics(average_stay.values()),
            no_shows: metric_statistics(no_shows.values()),
            consents: metric_statistics(consents),
        }
    }
}

/// Consent percentage for every day `1..=through_day`
pub fn consent_percentages(registry: &ConsentRegistry, through_day: u32) -> Vec<MetricValue> {
    (1..=through_day)
        .map(|day| {
            MetricValue::percentage(
                registry.consents_on(day),
                registry.calls_on(day) as usize,
                Sentinel::NoCalls,
            )
        })
        .collect()
}

/// Statistics of one series, `values[i]` being day `i + 1`
pub fn metric_statistics(values: &[MetricValue]) -> MetricStatistics {
    let no_previous = MetricValue::Missing(Sentinel::NoPreviousDay);
    let Some((&current, history)) = values.split_last() else {
        return MetricStatistics {
            current: no_previous,
            delta: no_previous,
            average: no_previous,
            average_delta: no_previous,
        };
    };

    let delta = match (current, history.last()) {
        (_, None) => no_previous,
        (MetricValue::Missing(_), Some(_)) => current,
        (MetricValue::Value(now), Some(MetricValue::Value(before))) => {
            MetricValue::Value(now - before)
        }
        (MetricValue::Value(_), Some(MetricValue::Missing(_))) => no_previous,
    };

    let average = mean(values).map_or(current, MetricValue::Value);

    let average_delta = if history.is_empty() {
        no_previous
    } else {
        match (mean(values), mean(history)) {
            (Some(now), Some(before)) => MetricValue::Value(now - before),
            _ => no_previous,
        }
    };

    MetricStatistics {
        current,
        delta,
        average,
        average_delta,
    }
}

/// Mean of the numeric values, ignoring sentinels
fn mean(values: &[MetricValue]) -> Option<f64> {
    let numbers: Vec<f64> = values.iter().filter_map(MetricValue::value).collect();
    if numbers.is_empty() {
        None
    } else {
        Some(numbers.iter().sum::<f64>() / numbers.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64) -> MetricValue {
        MetricValue::Value(x)
    }

    #[test]
    fn test_single_point_has_no_previous_day() {
        let stats = metric_statistics(&[v(50.0)]);
        assert_eq!(stats.current, v(50.0));
        assert_eq!(stats.delta, MetricValue::Missing(Sentinel::NoPreviousDay));
        assert_eq!(stats.average, v(50.0));
        assert_eq!(stats.average_delta, MetricValue::Missing(Sentinel::NoPreviousDay));
    }

    #[test]
    fn test_delta_and_average() {
        let stats = metric_statistics(&[v(20.0), v(40.0), v(60.0)]);
        assert_eq!(stats.delta, v(20.0));
        assert_eq!(stats.average, v(40.0));
        // mean(20, 40, 60) - mean(20, 40)
        assert_eq!(stats.average_delta, v(10.0));
    }

    #[test]
    fn test_sentinel_current_is_reported_as_is() {
        let none = MetricValue::Missing(Sentinel::NoIncomingPatients);
        let stats = metric_statistics(&[v(25.0), none]);
        assert_eq!(stats.current, none);
        assert_eq!(stats.delta, none);
        assert_eq!(stats.average, v(25.0));
        assert_eq!(stats.average_delta, v(0.0));
    }

    #[test]
    fn test_sentinel_previous_gives_no_previous_day() {
        let none = MetricValue::Missing(Sentinel::NoIncomingPatients);
        let stats = metric_statistics(&[none, v(10.0)]);
        assert_eq!(stats.delta, MetricValue::Missing(Sentinel::NoPreviousDay));
        assert_eq!(stats.average, v(10.0));
        assert_eq!(stats.average_delta, MetricValue::Missing(Sentinel::NoPreviousDay));
    }

    #[test]
    fn test_consent_percentages_use_calls_as_denominator() {
        use crate::models::QueueEntryId;

        let mut registry = ConsentRegistry::new();
        registry.increment_calls(2);
        registry.increment_calls(2);
        registry.register(2, QueueEntryId(1));
        registry.commit(2, vec![QueueEntryId(1)]);

        let values = consent_percentages(&registry, 2);
        assert_eq!(values[0], MetricValue::Missing(Sentinel::NoCalls));
        assert_eq!(values[1], v(50.0));
    }
}
