//! One reconciliation pass from source readings to merged records

use crate::{
    active_alerts, project, Alert, ConvertedSource, FinalValue, ForecastRecord, Grid,
    PriorityMerger, ReconcileError, ReconcileResult, SourceAggregator, SourceBatch, SourceSet,
    Timeline,
};
use chrono::FixedOffset;
use serde::Serialize;
use tracing::{debug, info, instrument};
use wxm_core::{FieldSchema, ReadingValue, SourceId, Timestamp, SECONDS_PER_DAY, SECONDS_PER_HOUR};

/// Caller-supplied settings shared by every section of a pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassConfig {
    /// Instant the timelines are anchored to
    pub reference: Timestamp,
    pub utc_offset: FixedOffset,
    /// Source ids, highest priority first
    pub priority: Vec<SourceId>,
    /// Source defining the canonical grid; the pass fails without it
    pub mandatory: Option<SourceId>,
}

impl PassConfig {
    fn check_mandatory(&self, sources: &SourceSet) -> ReconcileResult<()> {
        match &self.mandatory {
            Some(id) if sources.get(id).map_or(true, SourceBatch::is_empty) => {
                Err(ReconcileError::MissingMandatorySource(id.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Grid, horizon and output fields of one timeline
#[derive(Debug, Clone, PartialEq)]
pub struct SectionSpec {
    pub grid: Grid,
    /// Horizon in seconds past the reference instant
    pub horizon: i64,
    pub schema: FieldSchema,
}

impl SectionSpec {
    pub fn hourly(hours: i64, schema: FieldSchema) -> ReconcileResult<Self> {
        Self::with_horizon(Grid::Hourly, hours, schema)
    }

    pub fn daily(days: i64, schema: FieldSchema) -> ReconcileResult<Self> {
        Self::with_horizon(Grid::Daily, days, schema)
    }

    /// `units` whole grid steps past the reference instant
    fn with_horizon(grid: Grid, units: i64, schema: FieldSchema) -> ReconcileResult<Self> {
        let horizon = units.checked_mul(grid.width()).ok_or_else(|| {
            ReconcileError::InvalidTimeline(format!("{units} {grid:?} steps overflow the horizon"))
        })?;
        Ok(Self {
            grid,
            horizon,
            schema,
        })
    }
}

/// Reconcile a single section. Fails as a whole: no records are returned
/// when the mandatory source is missing or the timeline is invalid.
#[instrument(skip_all, fields(grid = ?section.grid, sources = sources.len()))]
pub fn reconcile(
    pass: &PassConfig,
    section: &SectionSpec,
    sources: &SourceSet,
) -> ReconcileResult<Vec<ForecastRecord>> {
    pass.check_mandatory(sources)?;
    let timeline = Timeline::build(pass.reference, section.horizon, section.grid, pass.utc_offset)?;
    let batches = sources.in_priority(&pass.priority);
    Ok(reconcile_on(&timeline, &section.schema, &batches))
}

fn reconcile_on(
    timeline: &Timeline,
    schema: &FieldSchema,
    batches: &[&SourceBatch],
) -> Vec<ForecastRecord> {
    let converted: Vec<ConvertedSource> = batches
        .iter()
        .map(|batch| {
            let mut aggregator = SourceAggregator::new(&batch.source, timeline);
            let mut contributions = 0usize;
            for reading in &batch.readings {
                for spec in schema.consumers_of(&reading.field) {
                    contributions += project(reading, spec, timeline, &mut aggregator);
                }
            }
            debug!(
                source = %batch.source,
                readings = batch.readings.len(),
                contributions,
                "Projected source readings"
            );
            aggregator.finalize().into_target_units(schema)
        })
        .collect();

    PriorityMerger::new(schema).merge(timeline, &converted)
}

/// Everything a full forecast pass produces
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSpec {
    pub latitude: f64,
    pub longitude: f64,
    /// Fields of the current-conditions record
    pub currently: FieldSchema,
    pub hourly: SectionSpec,
    pub daily: SectionSpec,
    /// Unit system label the schemas convert into, echoed in the flags
    pub units: String,
}

impl ForecastSpec {
    /// DarkSky-shaped output: 48 hours and 8 days by default
    pub fn darksky(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            currently: FieldSchema::darksky_currently(),
            hourly: SectionSpec {
                grid: Grid::Hourly,
                horizon: 48 * SECONDS_PER_HOUR,
                schema: FieldSchema::darksky_hourly(),
            },
            daily: SectionSpec {
                grid: Grid::Daily,
                horizon: 8 * SECONDS_PER_DAY,
                schema: FieldSchema::darksky_daily(),
            },
            units: "us".to_string(),
        }
    }
}

/// Records of one timeline plus the headline summary and icon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSection {
    pub summary: Option<ReadingValue>,
    pub icon: Option<ReadingValue>,
    pub data: Vec<ForecastRecord>,
}

impl ForecastSection {
    pub fn new(data: Vec<ForecastRecord>) -> Self {
        let headline = |name: &str| match data.first().and_then(|r| r.get(name)) {
            Some(FinalValue::Value(v)) => Some(v.clone()),
            _ => None,
        };
        Self {
            summary: headline("summary"),
            icon: headline("icon"),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flags {
    /// Sources that supplied at least one value, in priority order
    pub sources: Vec<SourceId>,
    pub units: String,
}

/// Unified forecast for one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub latitude: f64,
    pub longitude: f64,
    /// UTC offset in hours
    pub offset: f64,
    pub currently: Option<ForecastRecord>,
    pub hourly: ForecastSection,
    pub daily: ForecastSection,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<Alert>,
    pub flags: Flags,
}

/// Run the current, hourly and daily passes over one source set.
#[instrument(skip_all, fields(reference = pass.reference, sources = sources.len()))]
pub fn build_forecast(
    pass: &PassConfig,
    spec: &ForecastSpec,
    sources: &SourceSet,
) -> ReconcileResult<Forecast> {
    pass.check_mandatory(sources)?;

    let current = Timeline::build(pass.reference, 1, Grid::Hourly, pass.utc_offset)?;
    let hourly = Timeline::build(
        pass.reference,
        spec.hourly.horizon,
        spec.hourly.grid,
        pass.utc_offset,
    )?;
    let daily = Timeline::build(
        pass.reference,
        spec.daily.horizon,
        spec.daily.grid,
        pass.utc_offset,
    )?;

    let batches = sources.in_priority(&pass.priority);
    let currently = if spec.currently.is_empty() {
        None
    } else {
        reconcile_on(&current, &spec.currently, &batches)
            .into_iter()
            .next()
    };
    let hourly = reconcile_on(&hourly, &spec.hourly.schema, &batches);
    let daily = reconcile_on(&daily, &spec.daily.schema, &batches);

    let contributed = |id: &str| {
        currently
            .iter()
            .chain(hourly.iter())
            .chain(daily.iter())
            .any(|record| record.fields.iter().any(|f| f.source.as_deref() == Some(id)))
    };
    let used: Vec<SourceId> = batches
        .iter()
        .map(|b| b.source.clone())
        .filter(|id| contributed(id))
        .collect();

    let alerts = active_alerts(&batches, pass.reference);

    info!(
        hourly = hourly.len(),
        daily = daily.len(),
        alerts = alerts.len(),
        sources = ?used,
        "Forecast pass complete"
    );

    Ok(Forecast {
        latitude: spec.latitude,
        longitude: spec.longitude,
        offset: pass.utc_offset.local_minus_utc() as f64 / SECONDS_PER_HOUR as f64,
        currently,
        hourly: ForecastSection::new(hourly),
        daily: ForecastSection::new(daily),
        alerts,
        flags: Flags {
            sources: used,
            units: spec.units.clone(),
        },
    })
}
