//! Per-bucket accumulation state

use crate::Timeline;
use std::collections::BTreeMap;
use tracing::debug;
use wxm_core::{AggregationStrategy, FieldSpec, ReadingValue, SourceId, Timestamp, Unit};

/// Running state for one field in one bucket
#[derive(Debug, Clone, PartialEq)]
pub enum AccumulatorState {
    PointMatch { value: Option<ReadingValue> },
    WeightedAverage { weighted_sum: f64, hours: f64 },
    MaxWithTimestamp { best: Option<(f64, Timestamp)> },
    MinWithTimestamp { best: Option<(f64, Timestamp)> },
}

/// Finalized value of one field in one bucket
#[derive(Debug, Clone, PartialEq)]
pub enum FinalValue {
    Value(ReadingValue),
    /// Extreme and the instant it occurred, always merged as a pair
    Extreme { value: f64, at: Timestamp },
}

impl FinalValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FinalValue::Value(v) => v.as_f64(),
            FinalValue::Extreme { value, .. } => Some(*value),
        }
    }
}

impl AccumulatorState {
    pub fn new(strategy: AggregationStrategy) -> Self {
        match strategy {
            AggregationStrategy::PointMatch => AccumulatorState::PointMatch { value: None },
            AggregationStrategy::WeightedAverage => AccumulatorState::WeightedAverage {
                weighted_sum: 0.0,
                hours: 0.0,
            },
            AggregationStrategy::MaxWithTimestamp => {
                AccumulatorState::MaxWithTimestamp { best: None }
            }
            AggregationStrategy::MinWithTimestamp => {
                AccumulatorState::MinWithTimestamp { best: None }
            }
        }
    }

    /// Feed one contribution. `hours` weighs averages, `at` stamps extremes.
    /// Zero-weight contributions are ignored by every strategy but PointMatch.
    pub fn add(&mut self, value: &ReadingValue, hours: f64, at: Timestamp) {
        match self {
            AccumulatorState::PointMatch { value: slot } => {
                *slot = Some(value.clone());
            }
            AccumulatorState::WeightedAverage {
                weighted_sum,
                hours: total,
            } => {
                if let Some(v) = value.as_f64() {
                    if hours > 0.0 {
                        *weighted_sum += v * hours;
                        *total += hours;
                    }
                }
            }
            AccumulatorState::MaxWithTimestamp { best } => {
                if let Some(v) = value.as_f64() {
                    if hours > 0.0 && best.map_or(true, |(b, _)| v > b) {
                        *best = Some((v, at));
                    }
                }
            }
            AccumulatorState::MinWithTimestamp { best } => {
                if let Some(v) = value.as_f64() {
                    if hours > 0.0 && best.map_or(true, |(b, _)| v < b) {
                        *best = Some((v, at));
                    }
                }
            }
        }
    }

    pub fn finalize(&self) -> Option<FinalValue> {
        match self {
            AccumulatorState::PointMatch { value } => value.clone().map(FinalValue::Value),
            AccumulatorState::WeightedAverage {
                weighted_sum,
                hours,
            } => {
                if *hours > 0.0 {
                    Some(FinalValue::Value(ReadingValue::Number(weighted_sum / hours)))
                } else {
                    None
                }
            }
            AccumulatorState::MaxWithTimestamp { best }
            | AccumulatorState::MinWithTimestamp { best } => {
                best.map(|(value, at)| FinalValue::Extreme { value, at })
            }
        }
    }
}

/// Accumulation state of one source across a whole timeline
#[derive(Debug, Clone)]
pub struct SourceAggregator {
    source: SourceId,
    buckets: Vec<BTreeMap<String, AccumulatorState>>,
    units: BTreeMap<String, Unit>,
}

impl SourceAggregator {
    pub fn new(source: &str, timeline: &Timeline) -> Self {
        Self {
            source: source.to_string(),
            buckets: vec![BTreeMap::new(); timeline.len()],
            units: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Accumulator for `spec` in bucket `index`, created on first use
    pub fn accumulator(&mut self, index: usize, spec: &FieldSpec) -> &mut AccumulatorState {
        self.buckets[index]
            .entry(spec.name.clone())
            .or_insert_with(|| AccumulatorState::new(spec.strategy))
    }

    /// Record the unit a field is reported in. Returns false when it
    /// contradicts the unit of earlier readings for the same field.
    pub fn claim_unit(&mut self, field: &str, unit: Unit) -> bool {
        *self.units.entry(field.to_string()).or_insert(unit) == unit
    }

    /// Finalize every accumulator once, dropping fields that saw no data
    pub fn finalize(self) -> FinalizedSource {
        let buckets: Vec<BTreeMap<String, FinalValue>> = self
            .buckets
            .iter()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|(name, state)| state.finalize().map(|v| (name.clone(), v)))
                    .collect()
            })
            .collect();

        debug!(
            source = %self.source,
            values = buckets.iter().map(BTreeMap::len).sum::<usize>(),
            "Finalized source accumulators"
        );

        FinalizedSource {
            source: self.source,
            buckets,
            units: self.units,
        }
    }
}

/// Finalized values of one source, still in the provider's units
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedSource {
    pub source: SourceId,
    pub buckets: Vec<BTreeMap<String, FinalValue>>,
    pub units: BTreeMap<String, Unit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(v: f64) -> ReadingValue {
        ReadingValue::Number(v)
    }

    #[test]
    fn test_weighted_average_by_overlap() {
        let mut acc = AccumulatorState::new(AggregationStrategy::WeightedAverage);
        acc.add(&num(10.0), 1.0, 0);
        acc.add(&num(20.0), 1.0, 0);
        assert_eq!(acc.finalize(), Some(FinalValue::Value(num(15.0))));

        let mut acc = AccumulatorState::new(AggregationStrategy::WeightedAverage);
        acc.add(&num(10.0), 3.0, 0);
        acc.add(&num(30.0), 1.0, 0);
        assert_eq!(acc.finalize(), Some(FinalValue::Value(num(15.0))));
    }

    #[test]
    fn test_weighted_average_without_hours_is_none() {
        let mut acc = AccumulatorState::new(AggregationStrategy::WeightedAverage);
        acc.add(&num(10.0), 0.0, 0);
        assert_eq!(acc.finalize(), None);
    }

    #[test]
    fn test_zero_is_a_value() {
        let mut acc = AccumulatorState::new(AggregationStrategy::WeightedAverage);
        acc.add(&num(0.0), 2.0, 0);
        assert_eq!(acc.finalize(), Some(FinalValue::Value(num(0.0))));

        let mut acc = AccumulatorState::new(AggregationStrategy::MaxWithTimestamp);
        acc.add(&num(0.0), 1.0, 42);
        assert_eq!(acc.finalize(), Some(FinalValue::Extreme { value: 0.0, at: 42 }));
    }

    #[test]
    fn test_max_never_regresses() {
        let mut acc = AccumulatorState::new(AggregationStrategy::MaxWithTimestamp);
        for (i, v) in [5.0, 3.0, 9.0, 7.0].into_iter().enumerate() {
            acc.add(&num(v), 1.0, 100 * (i as i64 + 1));
        }
        assert_eq!(acc.finalize(), Some(FinalValue::Extreme { value: 9.0, at: 300 }));
    }

    #[test]
    fn test_max_keeps_first_of_equal_candidates() {
        let mut acc = AccumulatorState::new(AggregationStrategy::MaxWithTimestamp);
        acc.add(&num(4.0), 1.0, 10);
        acc.add(&num(4.0), 1.0, 20);
        assert_eq!(acc.finalize(), Some(FinalValue::Extreme { value: 4.0, at: 10 }));
    }

    #[test]
    fn test_min_tracks_smallest() {
        let mut acc = AccumulatorState::new(AggregationStrategy::MinWithTimestamp);
        acc.add(&num(-2.0), 1.0, 10);
        acc.add(&num(-5.0), 1.0, 20);
        acc.add(&num(1.0), 1.0, 30);
        assert_eq!(acc.finalize(), Some(FinalValue::Extreme { value: -5.0, at: 20 }));
    }

    #[test]
    fn test_point_match_last_write_wins() {
        let mut acc = AccumulatorState::new(AggregationStrategy::PointMatch);
        assert_eq!(acc.finalize(), None);
        acc.add(&ReadingValue::from("cloudy"), 0.0, 0);
        acc.add(&ReadingValue::from("rain"), 0.0, 0);
        assert_eq!(
            acc.finalize(),
            Some(FinalValue::Value(ReadingValue::from("rain")))
        );
    }

    #[test]
    fn test_text_is_ignored_by_numeric_strategies() {
        let mut acc = AccumulatorState::new(AggregationStrategy::WeightedAverage);
        acc.add(&ReadingValue::from("n/a"), 1.0, 0);
        assert_eq!(acc.finalize(), None);
    }

    #[test]
    fn test_unit_claims() {
        let timeline = Timeline::build(
            0,
            3_600,
            crate::Grid::Hourly,
            chrono::FixedOffset::east_opt(0).unwrap(),
        )
        .unwrap();
        let mut agg = SourceAggregator::new("noaa", &timeline);
        assert!(agg.claim_unit("temperature", Unit::Celsius));
        assert!(agg.claim_unit("temperature", Unit::Celsius));
        assert!(!agg.claim_unit("temperature", Unit::Fahrenheit));
        assert_eq!(agg.source(), "noaa");
    }
}
