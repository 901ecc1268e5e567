use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use wxm_core::{parse_timestamp, FieldSchema, IntervalError, SourceId, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Offset of local time from UTC, in hours (may be fractional)
    #[serde(default)]
    pub utc_offset_hours: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            utc_offset_hours: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default = "default_hourly_hours")]
    pub hourly_hours: i64,
    #[serde(default = "default_daily_days")]
    pub daily_days: i64,
}

fn default_hourly_hours() -> i64 {
    48
}

fn default_daily_days() -> i64 {
    8
}

/// Longest accepted horizons, about a year in either grid
pub const MAX_HOURLY_HOURS: i64 = 24 * 366;
pub const MAX_DAILY_DAYS: i64 = 366;

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            hourly_hours: default_hourly_hours(),
            daily_days: default_daily_days(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Highest priority first
    #[serde(default)]
    pub priority: Vec<SourceId>,
    pub mandatory: Option<SourceId>,
    /// Source id -> JSON payload file
    #[serde(default)]
    pub files: BTreeMap<SourceId, PathBuf>,
}

/// Per-section schema overrides; missing sections use the built-in ones
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub currently: Option<FieldSchema>,
    pub hourly: Option<FieldSchema>,
    pub daily: Option<FieldSchema>,
    /// Label for the unit system the schemas target
    pub units: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Written to stdout when unset
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Fixed RFC 3339 reference instant; the current time when unset
    pub reference_time: Option<String>,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid UTC offset: {0} hours")]
    InvalidOffset(f64),
    #[error("Invalid reference time: {0}")]
    ReferenceTime(#[from] IntervalError),
    #[error("Horizon must be positive: {0}")]
    InvalidHorizon(&'static str),
    #[error("Horizon {field} = {value} exceeds the maximum of {max}")]
    HorizonTooLong {
        field: &'static str,
        value: i64,
        max: i64,
    },
    #[error("Mandatory source {0:?} has no configured file")]
    UnknownMandatorySource(SourceId),
}

impl AppConfig {
    /// Load configuration from WXMERGE_CONFIG path (TOML) if present, with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("WXMERGE_CONFIG").unwrap_or_else(|_| "wxmerge.toml".to_string());
        if Path::new(&path).exists() {
            Self::load_from(&path)
        } else {
            Ok(AppConfig::default())
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path)?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let cfg = toml::from_str::<AppConfig>(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.utc_offset()?;
        self.reference_timestamp()?;
        if self.timeline.hourly_hours <= 0 {
            return Err(ConfigError::InvalidHorizon("hourly_hours"));
        }
        if self.timeline.daily_days <= 0 {
            return Err(ConfigError::InvalidHorizon("daily_days"));
        }
        for (field, value, max) in [
            ("hourly_hours", self.timeline.hourly_hours, MAX_HOURLY_HOURS),
            ("daily_days", self.timeline.daily_days, MAX_DAILY_DAYS),
        ] {
            if value > max {
                return Err(ConfigError::HorizonTooLong { field, value, max });
            }
        }
        match &self.sources.mandatory {
            Some(id) if !self.sources.files.contains_key(id) => {
                Err(ConfigError::UnknownMandatorySource(id.clone()))
            }
            _ => Ok(()),
        }
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        let hours = self.location.utc_offset_hours;
        if !hours.is_finite() {
            return Err(ConfigError::InvalidOffset(hours));
        }
        FixedOffset::east_opt((hours * 3600.0).round() as i32).ok_or(ConfigError::InvalidOffset(hours))
    }

    /// Configured reference instant, if pinned
    pub fn reference_timestamp(&self) -> Result<Option<Timestamp>, ConfigError> {
        Ok(self
            .reference_time
            .as_deref()
            .map(parse_timestamp)
            .transpose()?)
    }

    /// Priority list with configured-but-unlisted sources appended by id
    pub fn priority(&self) -> Vec<SourceId> {
        let mut priority = self.sources.priority.clone();
        for id in self.sources.files.keys() {
            if !priority.contains(id) {
                priority.push(id.clone());
            }
        }
        priority
    }

    pub fn units(&self) -> &str {
        self.schema.units.as_deref().unwrap_or("us")
    }

    pub fn currently_schema(&self) -> FieldSchema {
        self.schema
            .currently
            .clone()
            .unwrap_or_else(FieldSchema::darksky_currently)
    }

    pub fn hourly_schema(&self) -> FieldSchema {
        self.schema
            .hourly
            .clone()
            .unwrap_or_else(FieldSchema::darksky_hourly)
    }

    pub fn daily_schema(&self) -> FieldSchema {
        self.schema
            .daily
            .clone()
            .unwrap_or_else(FieldSchema::darksky_daily)
    }
}
