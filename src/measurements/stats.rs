use std::collections::BTreeMap;

use serde::Serialize;

use super::{
    repo_types::{Measurement, MeasurementValue},
    status::{effective_unit, sugar_context, sugar_mg_dl},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Summary {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                avg: None,
                min: None,
                max: None,
            };
        }
        let sum: f64 = values.iter().sum();
        Self {
            count: values.len(),
            avg: Some(sum / values.len() as f64),
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BloodPressureStats {
    pub count: usize,
    pub period_days: i64,
    pub systolic: Summary,
    pub diastolic: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<Summary>,
}

#[derive(Debug, Serialize)]
pub struct BloodSugarStats {
    pub count: usize,
    pub period_days: i64,
    pub unit: &'static str,
    pub overall: Summary,
    pub by_context: BTreeMap<String, Summary>,
}

/// Expects blood-pressure measurements; other shapes are skipped.
pub fn blood_pressure_stats(measurements: &[Measurement], period_days: i64) -> BloodPressureStats {
    let mut systolic = Vec::new();
    let mut diastolic = Vec::new();
    let mut pulse = Vec::new();
    for m in measurements {
        if let MeasurementValue::BloodPressure {
            systolic: s,
            diastolic: d,
            pulse: p,
        } = &m.value
        {
            systolic.push(f64::from(*s));
            diastolic.push(f64::from(*d));
            pulse.extend(p.map(f64::from));
        }
    }
    BloodPressureStats {
        count: systolic.len(),
        period_days,
        systolic: Summary::of(&systolic),
        diastolic: Summary::of(&diastolic),
        pulse: (!pulse.is_empty()).then(|| Summary::of(&pulse)),
    }
}

/// Blood sugar statistics in mg/dL, overall and per context.
pub fn blood_sugar_stats(measurements: &[Measurement], period_days: i64) -> BloodSugarStats {
    let mut all = Vec::new();
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for m in measurements {
        let Some(raw) = m.value.number() else {
            continue;
        };
        let mg_dl = sugar_mg_dl(raw, effective_unit(&m.value, &m.unit));
        all.push(mg_dl);
        groups
            .entry(sugar_context(&m.value, m.notes.as_deref()))
            .or_default()
            .push(mg_dl);
    }
    BloodSugarStats {
        count: all.len(),
        period_days,
        unit: "mg/dL",
        overall: Summary::of(&all),
        by_context: groups
            .into_iter()
            .map(|(context, values)| (context, Summary::of(&values)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurements::repo_types::{MeasurementSource, MeasurementStatus, MeasurementType};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn measurement(kind: MeasurementType, value: MeasurementValue, unit: &str, notes: Option<&str>) -> Measurement {
        let now = OffsetDateTime::now_utc();
        Measurement {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind,
            value,
            unit: unit.into(),
            timestamp: now,
            notes: notes.map(String::from),
            source: MeasurementSource::Manual,
            status: MeasurementStatus::Unknown,
            created_at: now,
        }
    }

    #[test]
    fn empty_summary_has_no_figures() {
        assert_eq!(
            Summary::of(&[]),
            Summary {
                count: 0,
                avg: None,
                min: None,
                max: None
            }
        );
    }

    #[test]
    fn blood_pressure_summaries() {
        let bp = |s, d, p| {
            measurement(
                MeasurementType::BloodPressure,
                MeasurementValue::BloodPressure {
                    systolic: s,
                    diastolic: d,
                    pulse: p,
                },
                "mmHg",
                None,
            )
        };
        let stats = blood_pressure_stats(&[bp(120, 80, Some(70)), bp(140, 90, None)], 30);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.systolic.avg, Some(130.0));
        assert_eq!(stats.diastolic.min, Some(80.0));
        assert_eq!(stats.diastolic.max, Some(90.0));
        assert_eq!(stats.pulse.map(|p| p.count), Some(1));
    }

    #[test]
    fn blood_sugar_groups_by_context_in_mg_dl() {
        let sugar = |value, unit, notes| {
            measurement(MeasurementType::BloodSugar, MeasurementValue::Scalar(value), unit, notes)
        };
        let stats = blood_sugar_stats(
            &[
                sugar(90.0, "mg/dL", Some("fasting")),
                sugar(5.0, "mmol/L", Some("before breakfast")),
                sugar(160.0, "mg/dL", Some("after meal")),
                sugar(100.0, "mg/dL", None),
            ],
            7,
        );
        assert_eq!(stats.count, 4);
        assert_eq!(stats.overall.max, Some(160.0));
        let fasting = &stats.by_context["fasting"];
        assert_eq!(fasting.count, 2);
        assert_eq!(fasting.avg, Some(90.0));
        assert_eq!(stats.by_context["after meal"].count, 1);
        assert_eq!(stats.by_context["unknown"].count, 1);
    }
}
