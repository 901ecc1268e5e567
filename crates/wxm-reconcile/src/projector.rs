//! Projection of single readings onto the timeline

use crate::{SourceAggregator, Timeline};
use tracing::{trace, warn};
use wxm_core::{AggregationStrategy, FieldSpec, ReadingValue, SourceReading, SECONDS_PER_HOUR};

/// Forward `reading` to every bucket it touches for output field `spec`.
///
/// Returns the number of buckets that received a contribution; readings
/// outside the timeline simply contribute nothing.
pub fn project(
    reading: &SourceReading,
    spec: &FieldSpec,
    timeline: &Timeline,
    aggregator: &mut SourceAggregator,
) -> usize {
    if !aggregator.claim_unit(&spec.name, reading.unit) {
        warn!(
            source = %reading.source,
            field = %spec.name,
            unit = ?reading.unit,
            "Reading unit differs from earlier readings, skipping"
        );
        return 0;
    }

    let value = contribution_value(reading, spec);
    let interval = reading.interval;

    let Some(end) = interval.end else {
        // Point readings land in the bucket that contains them
        let Some(index) = timeline.index_of(interval.start) else {
            trace!(field = %spec.name, at = interval.start, "Point reading outside timeline");
            return 0;
        };
        aggregator
            .accumulator(index, spec)
            .add(&value, 1.0, interval.start);
        return 1;
    };

    match spec.strategy {
        AggregationStrategy::PointMatch => {
            let range = timeline.starting_within(interval.start, end);
            let touched = range.len();
            for index in range {
                aggregator.accumulator(index, spec).add(&value, 0.0, interval.start);
            }
            touched
        }
        AggregationStrategy::WeightedAverage
        | AggregationStrategy::MaxWithTimestamp
        | AggregationStrategy::MinWithTimestamp => {
            let mut touched = 0;
            for index in timeline.overlapping(interval.start, end) {
                let bucket = timeline.buckets()[index];
                let overlap = interval.overlap_seconds(bucket.start, bucket.end);
                if overlap == 0 {
                    continue;
                }
                let hours = overlap as f64 / SECONDS_PER_HOUR as f64;
                // extremes are stamped inside the bucket they count for
                let at = interval.start.max(bucket.start);
                aggregator.accumulator(index, spec).add(&value, hours, at);
                touched += 1;
            }
            touched
        }
    }
}

/// Value a reading contributes, turned into a per-hour rate when the field
/// asks for it and the reading spans a range.
fn contribution_value(reading: &SourceReading, spec: &FieldSpec) -> ReadingValue {
    match (spec.rate, reading.value.as_f64(), reading.interval.duration_hours()) {
        (true, Some(total), Some(hours)) => ReadingValue::Number(total / hours),
        _ => reading.value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FinalValue, Grid};
    use chrono::FixedOffset;
    use wxm_core::{TimeInterval, Unit};

    const H: i64 = 3_600;

    fn timeline(hours: i64) -> Timeline {
        Timeline::build(0, hours * H, Grid::Hourly, FixedOffset::east_opt(0).unwrap()).unwrap()
    }

    fn reading(interval: TimeInterval, value: f64) -> SourceReading {
        SourceReading {
            interval,
            value: ReadingValue::Number(value),
            source: "a".into(),
            field: "temperature".into(),
            unit: Unit::Celsius,
        }
    }

    fn finalized(agg: SourceAggregator, index: usize, field: &str) -> Option<FinalValue> {
        agg.finalize().buckets[index].get(field).cloned()
    }

    #[test]
    fn test_weighted_average_across_partial_overlaps() {
        // one daily bucket [0h, 24h), each reading overlaps it by 12h
        let timeline =
            Timeline::build(0, 86_400, Grid::Daily, FixedOffset::east_opt(0).unwrap()).unwrap();
        let spec = FieldSpec::new("temperature", AggregationStrategy::WeightedAverage, None);
        let mut agg = SourceAggregator::new("a", &timeline);

        let first = reading(TimeInterval::range(-12 * H, 12 * H).unwrap(), 10.0);
        let second = reading(TimeInterval::range(12 * H, 36 * H).unwrap(), 20.0);
        assert_eq!(project(&first, &spec, &timeline, &mut agg), 1);
        assert_eq!(project(&second, &spec, &timeline, &mut agg), 1);

        assert_eq!(
            finalized(agg, 0, "temperature"),
            Some(FinalValue::Value(ReadingValue::Number(15.0)))
        );
    }

    #[test]
    fn test_range_reading_covers_every_overlapped_bucket() {
        let timeline = timeline(24);
        let spec = FieldSpec::new("precipProbability", AggregationStrategy::WeightedAverage, None);
        let mut agg = SourceAggregator::new("b", &timeline);

        let touched = project(
            &reading(TimeInterval::range(10 * H, 16 * H).unwrap(), 0.4),
            &spec,
            &timeline,
            &mut agg,
        );
        assert_eq!(touched, 6);

        let result = agg.finalize();
        for (i, fields) in result.buckets.iter().enumerate() {
            let expected = (10..16).contains(&i).then(|| FinalValue::Value(ReadingValue::Number(0.4)));
            assert_eq!(fields.get("precipProbability").cloned(), expected, "bucket {i}");
        }
    }

    #[test]
    fn test_out_of_range_reading_contributes_nothing() {
        let timeline = timeline(4);
        let spec = FieldSpec::new("temperature", AggregationStrategy::WeightedAverage, None);
        let mut agg = SourceAggregator::new("a", &timeline);

        assert_eq!(project(&reading(TimeInterval::range(-2 * H, 0).unwrap(), 99.0), &spec, &timeline, &mut agg), 0);
        assert_eq!(project(&reading(TimeInterval::point(10 * H), 99.0), &spec, &timeline, &mut agg), 0);
        project(&reading(TimeInterval::range(0, H).unwrap(), 5.0), &spec, &timeline, &mut agg);

        assert_eq!(
            finalized(agg, 0, "temperature"),
            Some(FinalValue::Value(ReadingValue::Number(5.0)))
        );
    }

    #[test]
    fn test_point_match_by_containment_and_reference_instant() {
        let timeline = timeline(4);
        let spec = FieldSpec::new("temperature", AggregationStrategy::PointMatch, None);
        let mut agg = SourceAggregator::new("a", &timeline);

        // point inside bucket 1
        project(&reading(TimeInterval::point(H + 600), 1.0), &spec, &timeline, &mut agg);
        // range starting mid-bucket 2 only reaches bucket 3's reference instant
        project(&reading(TimeInterval::range(2 * H + 1, 4 * H).unwrap(), 2.0), &spec, &timeline, &mut agg);

        let result = agg.finalize();
        assert_eq!(result.buckets[0].get("temperature"), None);
        assert_eq!(
            result.buckets[1].get("temperature"),
            Some(&FinalValue::Value(ReadingValue::Number(1.0)))
        );
        assert_eq!(result.buckets[2].get("temperature"), None);
        assert_eq!(
            result.buckets[3].get("temperature"),
            Some(&FinalValue::Value(ReadingValue::Number(2.0)))
        );
    }

    #[test]
    fn test_max_stamped_inside_bucket() {
        let timeline = Timeline::build(0, 2 * 86_400, Grid::Daily, FixedOffset::east_opt(0).unwrap()).unwrap();
        let spec = FieldSpec::new("windGust", AggregationStrategy::MaxWithTimestamp, None);
        let mut agg = SourceAggregator::new("a", &timeline);

        // spans midnight between day 0 and day 1
        project(&reading(TimeInterval::range(86_400 - H, 86_400 + H).unwrap(), 12.0), &spec, &timeline, &mut agg);

        let result = agg.finalize();
        assert_eq!(
            result.buckets[0].get("windGust"),
            Some(&FinalValue::Extreme { value: 12.0, at: 86_400 - H })
        );
        assert_eq!(
            result.buckets[1].get("windGust"),
            Some(&FinalValue::Extreme { value: 12.0, at: 86_400 })
        );
    }

    #[test]
    fn test_rate_fields_divide_by_duration() {
        let timeline = timeline(6);
        let spec = FieldSpec::new("precipIntensity", AggregationStrategy::WeightedAverage, None).as_rate();
        let mut agg = SourceAggregator::new("a", &timeline);

        project(&reading(TimeInterval::range(0, 6 * H).unwrap(), 3.0), &spec, &timeline, &mut agg);
        assert_eq!(
            finalized(agg, 5, "precipIntensity"),
            Some(FinalValue::Value(ReadingValue::Number(0.5)))
        );
    }

    #[test]
    fn test_mixed_units_are_rejected() {
        let timeline = timeline(2);
        let spec = FieldSpec::new("temperature", AggregationStrategy::WeightedAverage, None);
        let mut agg = SourceAggregator::new("a", &timeline);

        project(&reading(TimeInterval::point(0), 10.0), &spec, &timeline, &mut agg);
        let mut fahrenheit = reading(TimeInterval::point(0), 50.0);
        fahrenheit.unit = Unit::Fahrenheit;
        assert_eq!(project(&fahrenheit, &spec, &timeline, &mut agg), 0);

        assert_eq!(
            finalized(agg, 0, "temperature"),
            Some(FinalValue::Value(ReadingValue::Number(10.0)))
        );
    }
}
