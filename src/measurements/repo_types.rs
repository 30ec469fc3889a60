use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{Collection, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    BloodPressure,
    BloodSugar,
    Weight,
    Temperature,
    HeartRate,
}

impl MeasurementType {
    pub const ALL: [MeasurementType; 5] = [
        MeasurementType::BloodPressure,
        MeasurementType::BloodSugar,
        MeasurementType::Weight,
        MeasurementType::Temperature,
        MeasurementType::HeartRate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MeasurementType::BloodPressure => "blood_pressure",
            MeasurementType::BloodSugar => "blood_sugar",
            MeasurementType::Weight => "weight",
            MeasurementType::Temperature => "temperature",
            MeasurementType::HeartRate => "heart_rate",
        }
    }

    pub fn default_unit(self) -> &'static str {
        match self {
            MeasurementType::BloodPressure => "mmHg",
            MeasurementType::BloodSugar => "mg/dL",
            MeasurementType::Weight => "kg",
            MeasurementType::Temperature => "°C",
            MeasurementType::HeartRate => "bpm",
        }
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reading payload. Blood pressure is an object of pressures; everything
/// else is either a bare number or a number with its own unit and context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Scalar(f64),
    BloodPressure {
        systolic: u32,
        diastolic: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pulse: Option<u32>,
    },
    Reading {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        measurement_context: Option<String>,
    },
}

impl MeasurementValue {
    /// The single number of a scalar or reading.
    pub fn number(&self) -> Option<f64> {
        match self {
            MeasurementValue::Scalar(v) => Some(*v),
            MeasurementValue::Reading { value, .. } => Some(*value),
            MeasurementValue::BloodPressure { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementSource {
    #[default]
    Manual,
    ImageUpload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementStatus {
    Normal,
    Anomaly,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MeasurementType,
    pub value: MeasurementValue,
    pub unit: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub source: MeasurementSource,
    pub status: MeasurementStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Record for Measurement {
    const COLLECTION: Collection = Collection::Measurements;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn sort_at(&self) -> OffsetDateTime {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_shapes_decode_to_the_right_variant() {
        let bp: MeasurementValue = serde_json::from_value(json!({"systolic": 120, "diastolic": 80})).unwrap();
        assert_eq!(
            bp,
            MeasurementValue::BloodPressure {
                systolic: 120,
                diastolic: 80,
                pulse: None
            }
        );
        let sugar: MeasurementValue =
            serde_json::from_value(json!({"value": 5.4, "unit": "mmol/L", "measurement_context": "fasting"}))
                .unwrap();
        assert_eq!(sugar.number(), Some(5.4));
        let scalar: MeasurementValue = serde_json::from_value(json!(72)).unwrap();
        assert_eq!(scalar, MeasurementValue::Scalar(72.0));
        assert!(serde_json::from_value::<MeasurementValue>(json!({"reading": 1})).is_err());
    }

    #[test]
    fn type_serializes_as_snake_case() {
        assert_eq!(serde_json::to_value(MeasurementType::HeartRate).unwrap(), json!("heart_rate"));
        for kind in MeasurementType::ALL {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }
}
