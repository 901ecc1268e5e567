//! Output field schemas
//!
//! A schema names every field an output record carries, the strategy used to
//! aggregate it, the reading field it is derived from, and its target unit.

use crate::types::AggregationStrategy;
use crate::units::Unit;
use serde::{Deserialize, Serialize};

/// One output field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    /// Reading field this is derived from, defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    pub strategy: AggregationStrategy,

    /// Target unit; `None` keeps the provider's unit (text fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,

    /// Divide ranged readings by their length in hours (totals to rates)
    #[serde(default)]
    pub rate: bool,
}

impl FieldSpec {
    pub fn new(name: &str, strategy: AggregationStrategy, unit: Option<Unit>) -> Self {
        Self {
            name: name.to_string(),
            from: None,
            strategy,
            unit,
            rate: false,
        }
    }

    /// Field with the default strategy for its name
    pub fn named(name: &str, unit: Option<Unit>) -> Self {
        Self::new(name, default_strategy(name), unit)
    }

    pub fn derived_from(mut self, source_field: &str) -> Self {
        self.from = Some(source_field.to_string());
        self
    }

    pub fn as_rate(mut self) -> Self {
        self.rate = true;
        self
    }

    /// Reading field name this spec consumes
    pub fn source_field(&self) -> &str {
        self.from.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered set of output fields for one forecast section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Specs fed by readings of `source_field`
    pub fn consumers_of<'a>(&'a self, source_field: &'a str) -> impl Iterator<Item = &'a FieldSpec> {
        self.fields
            .iter()
            .filter(move |f| f.source_field() == source_field)
    }

    /// Output fields for current conditions
    pub fn darksky_currently() -> Self {
        let mut fields = text_fields(&["summary", "icon", "precipType"]);
        fields.push(FieldSpec::named("precipIntensity", Some(Unit::Inches)).as_rate());
        fields.extend(common_measurements());
        fields.push(FieldSpec::named("ozone", Some(Unit::Unitless)));
        // current conditions are snapshots, not averages
        for field in &mut fields {
            field.strategy = AggregationStrategy::PointMatch;
        }
        Self::new(fields)
    }

    /// Output fields for the 48-hour outlook
    pub fn darksky_hourly() -> Self {
        let mut fields = text_fields(&["summary", "icon", "precipType"]);
        fields.push(
            FieldSpec::new(
                "precipIntensity",
                AggregationStrategy::WeightedAverage,
                Some(Unit::Inches),
            )
            .as_rate(),
        );
        fields.extend(common_measurements());
        fields.push(FieldSpec::named("ozone", Some(Unit::Unitless)));
        Self::new(fields)
    }

    /// Output fields for the 8-day outlook
    pub fn darksky_daily() -> Self {
        let mut fields = text_fields(&["summary", "icon"]);
        fields.push(
            FieldSpec::new(
                "precipIntensity",
                AggregationStrategy::WeightedAverage,
                Some(Unit::Inches),
            )
            .as_rate(),
        );
        fields.push(
            FieldSpec::named("precipIntensityMax", Some(Unit::Inches))
                .derived_from("precipIntensity")
                .as_rate(),
        );
        for (name, from) in [
            ("temperatureHigh", "temperature"),
            ("temperatureLow", "temperature"),
            ("temperatureMax", "temperature"),
            ("temperatureMin", "temperature"),
            ("apparentTemperatureHigh", "apparentTemperature"),
            ("apparentTemperatureLow", "apparentTemperature"),
            ("apparentTemperatureMax", "apparentTemperature"),
            ("apparentTemperatureMin", "apparentTemperature"),
        ] {
            fields.push(FieldSpec::named(name, Some(Unit::Fahrenheit)).derived_from(from));
        }
        fields.push(FieldSpec::named("precipProbability", Some(Unit::Fraction)));
        fields.push(FieldSpec::named("dewPoint", Some(Unit::Fahrenheit)));
        fields.push(FieldSpec::named("humidity", Some(Unit::Fraction)));
        fields.push(FieldSpec::named("pressure", Some(Unit::Hectopascals)));
        fields.push(FieldSpec::named("windSpeed", Some(Unit::MilesPerHour)));
        fields.push(FieldSpec::new(
            "windGust",
            AggregationStrategy::MaxWithTimestamp,
            Some(Unit::MilesPerHour),
        ));
        // daily bearings are averaged, hourly ones are taken as reported
        fields.push(FieldSpec::new(
            "windBearing",
            AggregationStrategy::WeightedAverage,
            Some(Unit::Degrees),
        ));
        fields.push(FieldSpec::named("cloudCover", Some(Unit::Fraction)));
        fields.push(FieldSpec::named("visibility", Some(Unit::Miles)));
        Self::new(fields)
    }
}

fn text_fields(names: &[&str]) -> Vec<FieldSpec> {
    names
        .iter()
        .map(|name| FieldSpec::new(name, AggregationStrategy::PointMatch, None))
        .collect()
}

fn common_measurements() -> Vec<FieldSpec> {
    vec![
        FieldSpec::named("precipProbability", Some(Unit::Fraction)),
        FieldSpec::named("temperature", Some(Unit::Fahrenheit)),
        FieldSpec::named("apparentTemperature", Some(Unit::Fahrenheit)),
        FieldSpec::named("dewPoint", Some(Unit::Fahrenheit)),
        FieldSpec::named("humidity", Some(Unit::Fraction)),
        FieldSpec::named("pressure", Some(Unit::Hectopascals)),
        FieldSpec::named("windSpeed", Some(Unit::MilesPerHour)),
        FieldSpec::named("windGust", Some(Unit::MilesPerHour)),
        FieldSpec::named("windBearing", Some(Unit::Degrees)),
        FieldSpec::named("cloudCover", Some(Unit::Fraction)),
        FieldSpec::named("visibility", Some(Unit::Miles)),
    ]
}

/// Default aggregation strategy for common output fields
pub fn default_strategy(field: &str) -> AggregationStrategy {
    match field {
        "summary" | "icon" | "precipType" | "windBearing" => AggregationStrategy::PointMatch,
        f if f.ends_with("High") || f.ends_with("Max") => AggregationStrategy::MaxWithTimestamp,
        f if f.ends_with("Low") || f.ends_with("Min") => AggregationStrategy::MinWithTimestamp,
        _ => AggregationStrategy::WeightedAverage,
    }
}
