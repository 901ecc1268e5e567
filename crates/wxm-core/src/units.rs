//! Unit conversion utilities
//!
//! Finalized values are converted exactly once, from the unit the provider
//! reported in to the unit the output schema asks for. Every conversion
//! rounds to two decimal places, so converting an already converted value
//! into the same unit is a no-op.

use serde::{Deserialize, Serialize};

/// Unit conversion error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("Conversion not supported: {from:?} -> {to:?}")]
    ConversionNotSupported { from: Unit, to: Unit },
}

/// Physical unit a value is expressed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Celsius,
    Fahrenheit,
    MetersPerSecond,
    KilometersPerHour,
    MilesPerHour,
    Meters,
    Miles,
    Millimeters,
    Inches,
    Pascals,
    Hectopascals,
    /// Ratio in `[0, 1]`
    Fraction,
    /// Ratio in `[0, 100]`
    Percent,
    Degrees,
    #[default]
    Unitless,
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert value between units, rounding the result to two decimals
pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64, UnitError> {
    if from == to {
        return Ok(round2(value));
    }

    let converted = match (from, to) {
        // C to F
        (Unit::Celsius, Unit::Fahrenheit) => value * 9.0 / 5.0 + 32.0,
        // F to C
        (Unit::Fahrenheit, Unit::Celsius) => (value - 32.0) * 5.0 / 9.0,
        // m/s to mph
        (Unit::MetersPerSecond, Unit::MilesPerHour) => value * 2.23694,
        (Unit::MilesPerHour, Unit::MetersPerSecond) => value / 2.23694,
        // km/h to mph
        (Unit::KilometersPerHour, Unit::MilesPerHour) => value / 1.609344,
        (Unit::MilesPerHour, Unit::KilometersPerHour) => value * 1.609344,
        (Unit::MetersPerSecond, Unit::KilometersPerHour) => value * 3.6,
        (Unit::KilometersPerHour, Unit::MetersPerSecond) => value / 3.6,
        // m to mi
        (Unit::Meters, Unit::Miles) => value / 1609.34,
        (Unit::Miles, Unit::Meters) => value * 1609.34,
        // mm to in
        (Unit::Millimeters, Unit::Inches) => value / 25.4,
        (Unit::Inches, Unit::Millimeters) => value * 25.4,
        // Pa to hPa
        (Unit::Pascals, Unit::Hectopascals) => value / 100.0,
        (Unit::Hectopascals, Unit::Pascals) => value * 100.0,
        (Unit::Percent, Unit::Fraction) => value / 100.0,
        (Unit::Fraction, Unit::Percent) => value * 100.0,
        _ => return Err(UnitError::ConversionNotSupported { from, to }),
    };

    Ok(round2(converted))
}
