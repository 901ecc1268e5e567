//! Field-by-field priority overlay of converted sources

use crate::{ConvertedSource, ForecastRecord, MergedField, Timeline};
use wxm_core::FieldSchema;

/// Overlays sources field by field: the first source in priority order
/// holding a value wins, later sources fill the gaps.
pub struct PriorityMerger<'a> {
    schema: &'a FieldSchema,
}

impl<'a> PriorityMerger<'a> {
    pub fn new(schema: &'a FieldSchema) -> Self {
        Self { schema }
    }

    /// `sources` must already be in priority order
    pub fn merge(&self, timeline: &Timeline, sources: &[ConvertedSource]) -> Vec<ForecastRecord> {
        timeline
            .buckets()
            .iter()
            .enumerate()
            .map(|(index, bucket)| ForecastRecord {
                time: bucket.start,
                fields: self
                    .schema
                    .iter()
                    .map(|spec| {
                        // extremes come back as one (value, at) unit, never split
                        let winner = sources
                            .iter()
                            .find_map(|s| s.value(index, &spec.name).map(|v| (s, v)));
                        MergedField {
                            name: spec.name.clone(),
                            strategy: spec.strategy,
                            value: winner.map(|(_, v)| v.clone()),
                            source: winner.map(|(s, _)| s.source().to_string()),
                        }
                    })
                    .collect(),
            })
            .collect()
    }
}
