//! Core data types, interval parsing, units, and field schemas for wxmerge
//!
//! This crate holds the vocabulary shared by the reconciliation engine and
//! the provider adapters: interval-tagged readings, the per-field
//! aggregation strategy, and the unit conversions applied to finalized values.

pub mod interval;
pub mod pipeline;
pub mod schema;
pub mod types;
pub mod units;

pub use interval::*;
pub use pipeline::*;
pub use schema::*;
pub use types::*;
pub use units::*;
