use serde::Deserialize;
use time::OffsetDateTime;

use super::repo_types::{MeasurementSource, MeasurementType, MeasurementValue};

#[derive(Debug, Deserialize)]
pub struct CreateMeasurementRequest {
    #[serde(rename = "type")]
    pub kind: MeasurementType,
    pub value: MeasurementValue,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub timestamp: Option<OffsetDateTime>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub source: MeasurementSource,
}

/// `start`/`end` take RFC 3339 timestamps or plain `YYYY-MM-DD` dates;
/// a plain end date covers that whole day.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub kind: Option<MeasurementType>,
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}
