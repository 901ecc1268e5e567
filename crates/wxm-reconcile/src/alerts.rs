//! Active weather alerts

use crate::SourceBatch;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::warn;
use wxm_core::{parse_interval, Timestamp};

/// Alert as emitted in the forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub title: String,
    pub regions: Vec<String>,
    pub severity: Option<String>,
    pub time: Option<Timestamp>,
    pub expires: Timestamp,
    pub description: String,
    pub uri: Option<String>,
}

/// Collect unexpired alerts from `batches` (already in priority order).
///
/// Zone codes resolve through the union of every batch's zone table, the
/// higher priority source winning on conflicts; unknown codes are kept.
pub fn active_alerts(batches: &[&SourceBatch], reference: Timestamp) -> Vec<Alert> {
    let mut zones: HashMap<&str, &str> = HashMap::new();
    for batch in batches {
        for (code, name) in &batch.zones {
            zones.entry(code.as_str()).or_insert(name.as_str());
        }
    }

    let mut seen = HashSet::new();
    let mut alerts = Vec::new();

    for batch in batches {
        for raw in &batch.alerts {
            let expires = match parse_interval(&raw.expires) {
                Ok(interval) => interval.start,
                Err(e) => {
                    warn!(source = %batch.source, alert = %raw.id, error = %e, "Alert expiry unreadable, skipping");
                    continue;
                }
            };
            if expires <= reference || !seen.insert(raw.id.as_str()) {
                continue;
            }

            alerts.push(Alert {
                title: raw.title.clone(),
                regions: raw
                    .zones
                    .iter()
                    .map(|code| zones.get(code.as_str()).copied().unwrap_or(code.as_str()).to_string())
                    .collect(),
                severity: raw.severity.clone(),
                time: raw
                    .onset
                    .as_deref()
                    .and_then(|onset| parse_interval(onset).ok())
                    .map(|interval| interval.start),
                expires,
                description: raw.description.split_whitespace().collect::<Vec<_>>().join(" "),
                uri: raw.url.clone(),
            });
        }
    }

    alerts
}
