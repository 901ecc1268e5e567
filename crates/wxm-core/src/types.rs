//! Core data types for interval-tagged weather readings

use crate::interval::IntervalError;
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Timestamp type (Unix epoch seconds)
pub type Timestamp = i64;

/// Identifier of a data provider (e.g. "noaa")
pub type SourceId = String;

pub const SECONDS_PER_HOUR: i64 = 3_600;
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Half-open validity window `[start, end)` of a reading.
///
/// An absent `end` marks a point reading valid at exactly `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
}

impl TimeInterval {
    pub fn point(at: Timestamp) -> Self {
        Self {
            start: at,
            end: None,
        }
    }

    /// Build a ranged interval, rejecting `end <= start`.
    pub fn range(start: Timestamp, end: Timestamp) -> Result<Self, IntervalError> {
        if end <= start {
            return Err(IntervalError::Malformed {
                input: format!("{}/{}", start, end),
                reason: "interval end must be after its start",
            });
        }
        Ok(Self {
            start,
            end: Some(end),
        })
    }

    /// Length in hours, `None` for point readings
    pub fn duration_hours(&self) -> Option<f64> {
        self.end
            .map(|end| (end - self.start) as f64 / SECONDS_PER_HOUR as f64)
    }

    /// Seconds shared with `[start, end)`. Zero when disjoint or for points.
    pub fn overlap_seconds(&self, start: Timestamp, end: Timestamp) -> i64 {
        match self.end {
            Some(own_end) => (own_end.min(end) - self.start.max(start)).max(0),
            None => 0,
        }
    }
}

/// A reading value: numeric for measurements, text for summaries and icons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Number(f64),
    Text(String),
}

impl ReadingValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ReadingValue::Number(v) => Some(*v),
            ReadingValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ReadingValue::Text(s) => Some(s),
            ReadingValue::Number(_) => None,
        }
    }
}

impl From<f64> for ReadingValue {
    fn from(v: f64) -> Self {
        ReadingValue::Number(v)
    }
}

impl From<&str> for ReadingValue {
    fn from(s: &str) -> Self {
        ReadingValue::Text(s.to_string())
    }
}

/// One provider-reported value with its validity interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReading {
    pub interval: TimeInterval,
    pub value: ReadingValue,
    pub source: SourceId,
    pub field: String,

    /// Native unit the provider reported the value in
    #[serde(default)]
    pub unit: Unit,
}

impl SourceReading {
    /// Parse a raw adapter reading. `Ok(None)` means the provider sent a null value.
    pub fn from_raw(source: &str, raw: RawReading) -> Result<Option<Self>, IntervalError> {
        let interval = crate::interval::parse_interval(&raw.valid_time)?;
        Ok(raw.value.map(|value| Self {
            interval,
            value,
            source: source.to_string(),
            field: raw.field,
            unit: raw.unit,
        }))
    }
}

/// Reading as emitted by a provider adapter, before interval parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub field: String,

    /// ISO-8601 timestamp, optionally followed by `/` and a duration
    #[serde(rename = "validTime")]
    pub valid_time: String,

    #[serde(default)]
    pub value: Option<ReadingValue>,

    #[serde(default)]
    pub unit: Unit,
}

/// Weather alert as published by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAlert {
    pub id: String,
    pub title: String,

    /// Zone or county codes the alert applies to
    #[serde(default)]
    pub zones: Vec<String>,

    #[serde(default)]
    pub severity: Option<String>,

    #[serde(default)]
    pub onset: Option<String>,

    pub expires: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub url: Option<String>,
}

/// Everything one provider fetch yields for a pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePayload {
    #[serde(default)]
    pub readings: Vec<RawReading>,

    #[serde(default)]
    pub alerts: Vec<RawAlert>,

    /// Zone code -> human readable region name
    #[serde(default)]
    pub zones: HashMap<String, String>,
}

/// Aggregation strategy, fixed per output field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// Value valid at the bucket's reference instant; last write wins
    PointMatch,
    /// Overlap-hours weighted mean
    WeightedAverage,
    /// Largest value and when it occurred
    MaxWithTimestamp,
    /// Smallest value and when it occurred
    MinWithTimestamp,
}

impl AggregationStrategy {
    /// Whether finalized values carry a companion timestamp
    pub fn is_extreme(self) -> bool {
        matches!(
            self,
            AggregationStrategy::MaxWithTimestamp | AggregationStrategy::MinWithTimestamp
        )
    }
}
