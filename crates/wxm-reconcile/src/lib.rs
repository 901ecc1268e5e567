//! Time-series reconciliation engine
//!
//! Projects interval-tagged readings from several providers onto a fixed
//! hourly or daily grid, aggregates them per bucket, converts units and
//! overlays the sources field by field in priority order.

pub mod aggregator;
pub mod alerts;
pub mod convert;
pub mod engine;
pub mod merger;
pub mod projector;
pub mod record;
pub mod source;
pub mod timeline;

pub use aggregator::*;
pub use alerts::*;
pub use convert::*;
pub use engine::*;
pub use merger::*;
pub use projector::*;
pub use record::*;
pub use source::*;
pub use timeline::*;

use thiserror::Error;
use wxm_core::SourceId;

/// Pass-level failures. Per-reading problems never surface here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("Mandatory source {0:?} produced no readings")]
    MissingMandatorySource(SourceId),

    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
