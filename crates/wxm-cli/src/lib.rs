//! wxmerge driver: loads provider payloads concurrently, runs one
//! reconciliation pass and hands the forecast to a sink.

pub mod sink;
pub mod source;

pub use sink::{FileSink, ForecastSink, StdoutSink};
pub use source::FileSource;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use wxm_config::AppConfig;
use wxm_core::{ReadingSource, Timestamp};
use wxm_reconcile::{
    build_forecast, Forecast, ForecastSpec, PassConfig, SectionSpec, SourceBatch, SourceSet,
};

/// Fetch every source concurrently. A failed source is logged and left
/// out; the pass decides later whether it can run without it.
pub async fn load_sources(sources: Vec<Arc<dyn ReadingSource>>) -> SourceSet {
    let mut tasks = JoinSet::new();
    for source in sources {
        tasks.spawn(async move {
            let result = source.fetch().await;
            (source.id().to_string(), result)
        });
    }

    let mut set = SourceSet::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, Ok(payload))) => set.insert(SourceBatch::from_payload(&id, payload)),
            Ok((id, Err(e))) => warn!(source = %id, error = %format!("{e:#}"), "Source unavailable"),
            Err(e) => warn!(error = %e, "Source task failed"),
        }
    }
    set
}

/// File-backed sources named in the configuration
pub fn configured_sources(cfg: &AppConfig) -> Vec<Arc<dyn ReadingSource>> {
    cfg.sources
        .files
        .iter()
        .map(|(id, path)| Arc::new(FileSource::new(id.clone(), path.clone())) as Arc<dyn ReadingSource>)
        .collect()
}

pub fn forecast_spec(cfg: &AppConfig) -> Result<ForecastSpec> {
    Ok(ForecastSpec {
        latitude: cfg.location.latitude,
        longitude: cfg.location.longitude,
        currently: cfg.currently_schema(),
        hourly: SectionSpec::hourly(cfg.timeline.hourly_hours, cfg.hourly_schema())
            .context("Invalid hourly timeline")?,
        daily: SectionSpec::daily(cfg.timeline.daily_days, cfg.daily_schema())
            .context("Invalid daily timeline")?,
        units: cfg.units().to_string(),
    })
}

/// Run one pass over `sources` as configured
pub async fn run(
    cfg: &AppConfig,
    sources: Vec<Arc<dyn ReadingSource>>,
    reference: Timestamp,
) -> Result<Forecast> {
    let pass = PassConfig {
        reference,
        utc_offset: cfg.utc_offset()?,
        priority: cfg.priority(),
        mandatory: cfg.sources.mandatory.clone(),
    };

    let spec = forecast_spec(cfg)?;
    let set = load_sources(sources).await;
    info!(loaded = set.len(), reference, "Sources loaded");

    let forecast = build_forecast(&pass, &spec, &set)
        .context("Reconciliation pass failed")?;
    Ok(forecast)
}

/// Sink selected by the output section
pub fn output_sink(cfg: &AppConfig) -> Result<Box<dyn ForecastSink>> {
    Ok(match &cfg.output.path {
        Some(path) => Box::new(FileSink::new(path, cfg.output.pretty)?),
        None => Box::new(StdoutSink::new(cfg.output.pretty)),
    })
}
