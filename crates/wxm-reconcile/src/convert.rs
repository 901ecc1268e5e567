//! Unit application between finalization and merge

use crate::{FinalValue, FinalizedSource};
use std::collections::BTreeMap;
use tracing::warn;
use wxm_core::{convert, FieldSchema, ReadingValue, SourceId, Unit};

/// Finalized values of one source, expressed in the schema's target units.
///
/// Only [`FinalizedSource::into_target_units`] builds this, so every value
/// reaching the merger has been converted exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedSource {
    source: SourceId,
    buckets: Vec<BTreeMap<String, FinalValue>>,
}

impl ConvertedSource {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn value(&self, bucket: usize, field: &str) -> Option<&FinalValue> {
        self.buckets.get(bucket).and_then(|fields| fields.get(field))
    }
}

impl FinalizedSource {
    pub fn into_target_units(self, schema: &FieldSchema) -> ConvertedSource {
        let FinalizedSource {
            source,
            buckets,
            units,
        } = self;

        let buckets = buckets
            .into_iter()
            .map(|fields| {
                fields
                    .into_iter()
                    .filter_map(|(name, value)| {
                        let native = units.get(&name).copied().unwrap_or_default();
                        // no target unit keeps the native one, still rounded
                        let target = schema
                            .get(&name)
                            .and_then(|spec| spec.unit)
                            .unwrap_or(native);
                        // readings without a unit are already in the target unit
                        let native = if native == Unit::Unitless { target } else { native };
                        let rescale = |v: f64| match convert(v, native, target) {
                            Ok(converted) => Some(converted),
                            Err(e) => {
                                warn!(source = %source, field = %name, error = %e, "Dropping unconvertible value");
                                None
                            }
                        };
                        let converted = match value {
                            FinalValue::Value(ReadingValue::Number(v)) => {
                                FinalValue::Value(ReadingValue::Number(rescale(v)?))
                            }
                            FinalValue::Extreme { value, at } => FinalValue::Extreme {
                                value: rescale(value)?,
                                at,
                            },
                            text @ FinalValue::Value(ReadingValue::Text(_)) => text,
                        };
                        Some((name, converted))
                    })
                    .collect()
            })
            .collect();

        ConvertedSource { source, buckets }
    }
}
