//! Finalized output records

use crate::FinalValue;
use serde::ser::{Serialize, SerializeMap, Serializer};
use wxm_core::{AggregationStrategy, SourceId, Timestamp};

/// One schema field after merge. `value == None` means no source had data.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedField {
    pub name: String,
    pub strategy: AggregationStrategy,
    pub value: Option<FinalValue>,
    /// Source the value came from
    pub source: Option<SourceId>,
}

/// One canonical bucket with every schema field resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    /// Bucket start
    pub time: Timestamp,
    pub fields: Vec<MergedField>,
}

impl ForecastRecord {
    pub fn get(&self, name: &str) -> Option<&FinalValue> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value.as_ref())
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FinalValue::as_f64)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FinalValue::Value(v) => v.as_str(),
            FinalValue::Extreme { .. } => None,
        }
    }

    pub fn source_of(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.source.as_deref())
    }
}

/// Renders `{"time": .., "<field>": .., "<extreme>": .., "<extreme>Time": ..}`
/// with explicit nulls for fields no source covered.
impl Serialize for ForecastRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extremes = self.fields.iter().filter(|f| f.strategy.is_extreme()).count();
        let mut map = serializer.serialize_map(Some(1 + self.fields.len() + extremes))?;
        map.serialize_entry("time", &self.time)?;

        for field in &self.fields {
            match &field.value {
                Some(FinalValue::Value(v)) => map.serialize_entry(&field.name, v)?,
                Some(FinalValue::Extreme { value, .. }) => {
                    map.serialize_entry(&field.name, value)?
                }
                None => map.serialize_entry(&field.name, &Option::<f64>::None)?,
            }
            if field.strategy.is_extreme() {
                let at = match &field.value {
                    Some(FinalValue::Extreme { at, .. }) => Some(*at),
                    _ => None,
                };
                map.serialize_entry(&format!("{}Time", field.name), &at)?;
            }
        }
        map.end()
    }
}
