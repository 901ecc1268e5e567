//! Canonical bucket timelines

use crate::{ReconcileError, ReconcileResult};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use wxm_core::{Timestamp, SECONDS_PER_DAY, SECONDS_PER_HOUR};

/// Width of one canonical bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grid {
    Hourly,
    Daily,
}

impl Grid {
    /// Bucket width in seconds
    pub fn width(self) -> i64 {
        match self {
            Grid::Hourly => SECONDS_PER_HOUR,
            Grid::Daily => SECONDS_PER_DAY,
        }
    }
}

/// One canonical slot `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Upper bound on buckets in one timeline
pub const MAX_BUCKETS: i64 = 10_000;

/// Gap-free, strictly increasing bucket sequence for one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    grid: Grid,
    buckets: Vec<Bucket>,
}

impl Timeline {
    /// Build buckets from the top of the local hour/day containing
    /// `reference` until `reference + horizon` is covered. The last bucket
    /// may run past the horizon.
    pub fn build(
        reference: Timestamp,
        horizon: i64,
        grid: Grid,
        offset: FixedOffset,
    ) -> ReconcileResult<Self> {
        if horizon <= 0 {
            return Err(ReconcileError::InvalidTimeline(format!(
                "horizon must be positive, got {}s",
                horizon
            )));
        }

        let width = grid.width();
        let offset = offset.local_minus_utc() as i64;
        let origin = (reference + offset).div_euclid(width) * width - offset;
        let target = reference
            .checked_add(horizon)
            .ok_or_else(|| ReconcileError::InvalidTimeline("horizon overflows".to_string()))?;
        let span = target
            .checked_sub(origin)
            .ok_or_else(|| ReconcileError::InvalidTimeline("horizon overflows".to_string()))?;
        let count = ceil_div(span, width);
        if count > MAX_BUCKETS {
            return Err(ReconcileError::InvalidTimeline(format!(
                "{count} buckets exceed the limit of {MAX_BUCKETS}"
            )));
        }

        let buckets = (0..count)
            .map(|i| {
                let start = origin + i * width;
                Bucket {
                    start,
                    end: start + width,
                }
            })
            .collect();

        Ok(Self { grid, buckets })
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Start of the first bucket
    pub fn start(&self) -> Timestamp {
        self.buckets.first().map_or(0, |b| b.start)
    }

    /// End of the last bucket
    pub fn end(&self) -> Timestamp {
        self.buckets.last().map_or(0, |b| b.end)
    }

    /// Index of the bucket containing `t`
    pub fn index_of(&self, t: Timestamp) -> Option<usize> {
        if self.is_empty() || t < self.start() || t >= self.end() {
            return None;
        }
        Some(((t - self.start()) / self.grid.width()) as usize)
    }

    /// Indices of buckets intersecting `[start, end)`
    pub fn overlapping(&self, start: Timestamp, end: Timestamp) -> Range<usize> {
        let width = self.grid.width();
        let first = (start - self.start()).div_euclid(width);
        let last = ceil_div(end - self.start(), width);
        self.clamp(first, last)
    }

    /// Indices of buckets whose start lies inside `[start, end)`
    pub fn starting_within(&self, start: Timestamp, end: Timestamp) -> Range<usize> {
        let width = self.grid.width();
        let first = ceil_div(start - self.start(), width);
        let last = ceil_div(end - self.start(), width);
        self.clamp(first, last)
    }

    fn clamp(&self, first: i64, last: i64) -> Range<usize> {
        let len = self.len() as i64;
        let first = first.clamp(0, len) as usize;
        let last = last.clamp(0, len) as usize;
        first..last.max(first)
    }
}

/// Ceiling division for a positive divisor
fn ceil_div(value: i64, divisor: i64) -> i64 {
    -((-value).div_euclid(divisor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_hourly_alignment_and_count() {
        // 2020-04-10T16:30:00Z
        let reference = 1_586_536_200;
        let timeline = Timeline::build(reference, 48 * 3_600, Grid::Hourly, utc()).unwrap();

        assert_eq!(timeline.start(), 1_586_534_400);
        // half an hour past the top of the hour needs one extra bucket
        assert_eq!(timeline.len(), 49);
        assert!(timeline.end() >= reference + 48 * 3_600);
    }

    #[test]
    fn test_aligned_reference_has_exact_count() {
        let timeline = Timeline::build(1_586_534_400, 48 * 3_600, Grid::Hourly, utc()).unwrap();
        assert_eq!(timeline.len(), 48);
    }

    #[test]
    fn test_buckets_are_contiguous() {
        let timeline = Timeline::build(1_586_536_200, 48 * 3_600, Grid::Hourly, utc()).unwrap();
        for pair in timeline.buckets().windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!(pair[0].end - pair[0].start, 3_600);
        }
    }

    #[test]
    fn test_daily_buckets_align_to_local_midnight() {
        let offset = FixedOffset::west_opt(4 * 3_600).unwrap();
        // 2020-04-10T16:30:00Z is 12:30 at UTC-4
        let timeline = Timeline::build(1_586_536_200, 8 * 86_400, Grid::Daily, offset).unwrap();

        // local midnight 2020-04-10T00:00:00-04:00
        assert_eq!(timeline.start(), 1_586_491_200);
        assert_eq!(timeline.len(), 9);
        assert_eq!(timeline.buckets()[1].start - timeline.buckets()[0].start, 86_400);
    }

    #[test]
    fn test_half_hour_offset_alignment() {
        let offset = FixedOffset::east_opt(5 * 3_600 + 1_800).unwrap();
        let timeline = Timeline::build(1_586_536_200, 3_600, Grid::Hourly, offset).unwrap();
        // 16:30Z is 22:00 local, already on the hour
        assert_eq!(timeline.start(), 1_586_536_200);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_zero_horizon_is_rejected() {
        let err = Timeline::build(0, 0, Grid::Hourly, utc()).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidTimeline(_)));
    }

    #[test]
    fn test_oversized_horizon_is_rejected() {
        let err = Timeline::build(0, 100_000 * 3_600, Grid::Hourly, utc()).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidTimeline(_)));

        let err = Timeline::build(0, i64::MAX, Grid::Daily, utc()).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidTimeline(_)));

        // the cap itself still builds
        let timeline = Timeline::build(0, MAX_BUCKETS * 3_600, Grid::Hourly, utc()).unwrap();
        assert_eq!(timeline.len() as i64, MAX_BUCKETS);
    }

    #[test]
    fn test_index_lookups() {
        let timeline = Timeline::build(0, 4 * 3_600, Grid::Hourly, utc()).unwrap();

        assert_eq!(timeline.index_of(0), Some(0));
        assert_eq!(timeline.index_of(3_599), Some(0));
        assert_eq!(timeline.index_of(3_600), Some(1));
        assert_eq!(timeline.index_of(4 * 3_600), None);
        assert_eq!(timeline.index_of(-1), None);

        assert_eq!(timeline.overlapping(1_800, 5_400), 0..2);
        assert_eq!(timeline.overlapping(3_600, 7_200), 1..2);
        assert_eq!(timeline.overlapping(-7_200, -3_600), 0..0);
        assert_eq!(timeline.overlapping(-7_200, 100 * 3_600), 0..4);

        assert_eq!(timeline.starting_within(1_800, 5_400), 1..2);
        assert_eq!(timeline.starting_within(0, 3_600), 0..1);
        assert_eq!(timeline.starting_within(10 * 3_600, 12 * 3_600), 4..4);
    }
}
