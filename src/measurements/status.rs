//! Threshold rules that flag a reading as normal or anomalous.

use super::repo_types::{MeasurementStatus, MeasurementType, MeasurementValue};

const MMOL_TO_MG_DL: f64 = 18.0;

pub const FASTING: &str = "fasting";
pub const AFTER_MEAL: &str = "after meal";
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Blood sugar in mg/dL, converting from mmol/L when that is the unit.
pub fn sugar_mg_dl(value: f64, unit: &str) -> f64 {
    if unit.trim().eq_ignore_ascii_case("mmol/l") {
        value * MMOL_TO_MG_DL
    } else {
        value
    }
}

fn celsius(value: f64, unit: &str) -> f64 {
    let unit = unit.trim().trim_start_matches('°');
    if unit.eq_ignore_ascii_case("f") || unit.eq_ignore_ascii_case("fahrenheit") {
        (value - 32.0) * 5.0 / 9.0
    } else {
        value
    }
}

fn flag(anomaly: bool) -> MeasurementStatus {
    if anomaly {
        MeasurementStatus::Anomaly
    } else {
        MeasurementStatus::Normal
    }
}

/// The unit a reading was taken in: its own, else the measurement's.
pub fn effective_unit<'a>(value: &'a MeasurementValue, unit: &'a str) -> &'a str {
    match value {
        MeasurementValue::Reading { unit: Some(own), .. } => own,
        _ => unit,
    }
}

pub fn classify(kind: MeasurementType, value: &MeasurementValue, unit: &str) -> MeasurementStatus {
    let unit = effective_unit(value, unit);
    match (kind, value) {
        (
            MeasurementType::BloodPressure,
            MeasurementValue::BloodPressure {
                systolic, diastolic, ..
            },
        ) => flag(*systolic >= 140 || *systolic < 90 || *diastolic >= 90 || *diastolic < 60),
        (MeasurementType::BloodPressure, _) | (MeasurementType::Weight, _) => MeasurementStatus::Unknown,
        (kind, value) => {
            let Some(v) = value.number() else {
                return MeasurementStatus::Unknown;
            };
            match kind {
                MeasurementType::BloodSugar => {
                    let mg_dl = sugar_mg_dl(v, unit);
                    flag(!(70.0..=180.0).contains(&mg_dl))
                }
                MeasurementType::HeartRate => flag(!(50.0..=120.0).contains(&v)),
                MeasurementType::Temperature => {
                    let c = celsius(v, unit);
                    flag(c < 35.0 || c >= 38.0)
                }
                MeasurementType::BloodPressure | MeasurementType::Weight => MeasurementStatus::Unknown,
            }
        }
    }
}

/// Blood-sugar context: the reading's own, else inferred from the notes.
pub fn sugar_context(value: &MeasurementValue, notes: Option<&str>) -> String {
    if let MeasurementValue::Reading {
        measurement_context: Some(context),
        ..
    } = value
    {
        if !context.trim().is_empty() {
            return context.trim().to_lowercase();
        }
    }
    let notes = notes.unwrap_or_default().to_lowercase();
    if ["fast", "before meal", "before breakfast"]
        .iter()
        .any(|term| notes.contains(term))
    {
        FASTING.to_string()
    } else if ["after meal", "post"].iter().any(|term| notes.contains(term)) {
        AFTER_MEAL.to_string()
    } else {
        UNKNOWN_CONTEXT.to_string()
    }
}
