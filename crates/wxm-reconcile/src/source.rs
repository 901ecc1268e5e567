//! Materialized per-source inputs for one pass

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};
use wxm_core::{RawAlert, SourceId, SourcePayload, SourceReading};

/// Everything one provider contributed to a pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceBatch {
    pub source: SourceId,
    pub readings: Vec<SourceReading>,
    pub alerts: Vec<RawAlert>,
    /// Zone code -> region name
    pub zones: HashMap<String, String>,
}

impl SourceBatch {
    pub fn new(source: &str, readings: Vec<SourceReading>) -> Self {
        Self {
            source: source.to_string(),
            readings,
            ..Default::default()
        }
    }

    /// Parse an adapter payload. Readings with malformed intervals are
    /// logged and dropped; null values are skipped silently.
    pub fn from_payload(source: &str, payload: SourcePayload) -> Self {
        let total = payload.readings.len();
        let mut malformed = 0usize;
        let readings: Vec<SourceReading> = payload
            .readings
            .into_iter()
            .filter_map(|raw| match SourceReading::from_raw(source, raw) {
                Ok(reading) => reading,
                Err(e) => {
                    malformed += 1;
                    warn!(source = %source, error = %e, "Dropping reading");
                    None
                }
            })
            .collect();

        debug!(
            source = %source,
            total,
            kept = readings.len(),
            malformed,
            "Parsed source payload"
        );

        Self {
            source: source.to_string(),
            readings,
            alerts: payload.alerts,
            zones: payload.zones,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// All sources that delivered data for a pass, keyed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceSet {
    batches: BTreeMap<SourceId, SourceBatch>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, batch: SourceBatch) {
        self.batches.insert(batch.source.clone(), batch);
    }

    pub fn get(&self, source: &str) -> Option<&SourceBatch> {
        self.batches.get(source)
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Batches in `priority` order, followed by unlisted sources by id
    pub fn in_priority<'a>(&'a self, priority: &'a [SourceId]) -> Vec<&'a SourceBatch> {
        let listed = priority.iter().filter_map(|id| self.batches.get(id));
        let unlisted = self
            .batches
            .values()
            .filter(|batch| !priority.contains(&batch.source));
        listed.chain(unlisted).collect()
    }
}

impl FromIterator<SourceBatch> for SourceSet {
    fn from_iter<I: IntoIterator<Item = SourceBatch>>(iter: I) -> Self {
        let mut set = SourceSet::new();
        for batch in iter {
            set.insert(batch);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wxm_core::RawReading;

    fn raw(valid_time: &str) -> RawReading {
        RawReading {
            field: "temperature".into(),
            valid_time: valid_time.into(),
            value: Some(1.0.into()),
            unit: Default::default(),
        }
    }

    #[test]
    fn test_malformed_readings_are_dropped() {
        let payload = SourcePayload {
            readings: vec![
                raw("2020-04-10T16:00:00+00:00/PT1H"),
                raw("yesterday-ish"),
                raw("2020-04-10T17:00:00+00:00/PT1H"),
            ],
            ..Default::default()
        };
        let batch = SourceBatch::from_payload("noaa", payload);
        assert_eq!(batch.readings.len(), 2);
        assert!(batch.readings.iter().all(|r| r.source == "noaa"));
    }

    #[test]
    fn test_priority_order_with_unlisted_sources() {
        let set: SourceSet = ["zeta", "climacell", "noaa"]
            .into_iter()
            .map(|id| SourceBatch::new(id, Vec::new()))
            .collect();
        let priority = vec!["noaa".to_string(), "missing".to_string(), "climacell".to_string()];

        let order: Vec<&str> = set
            .in_priority(&priority)
            .into_iter()
            .map(|b| b.source.as_str())
            .collect();
        assert_eq!(order, ["noaa", "climacell", "zeta"]);
    }
}
