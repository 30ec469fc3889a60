use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    measurements::repo_types::{Measurement, MeasurementType},
    medications::{dto::MedicationView, repo_types::Medication, services::view},
    store::{RecordQuery, RecordStore, StoreError},
    users::repo_types::UserRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Medications,
    Measurements,
    #[default]
    Combined,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Medications => "medications",
            ReportType::Measurements => "measurements",
            ReportType::Combined => "combined",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReportType::Medications => "Medication Report",
            ReportType::Measurements => "Measurements Report",
            ReportType::Combined => "Health Tracker Report",
        }
    }

    fn includes_medications(self) -> bool {
        matches!(self, ReportType::Medications | ReportType::Combined)
    }

    fn includes_measurements(self) -> bool {
        matches!(self, ReportType::Measurements | ReportType::Combined)
    }
}

#[derive(Debug, Serialize)]
pub struct ReportOwner {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub title: &'static str,
    pub report_type: ReportType,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub user: ReportOwner,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medications: Option<Vec<MedicationView>>,
    /// Newest first within each type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measurements: Option<BTreeMap<MeasurementType, Vec<Measurement>>>,
}

impl Report {
    pub fn file_name(&self, user_id: Uuid) -> String {
        format!("{}_report_{}.json", self.report_type.as_str(), user_id)
    }
}

pub async fn build_report(
    store: &dyn RecordStore,
    user_id: Uuid,
    report_type: ReportType,
    now: OffsetDateTime,
) -> Result<Report, StoreError> {
    let owned = RecordQuery::owned_by(user_id);
    let newest = RecordQuery::owned_by(user_id).newest_first();

    let medications = async {
        if report_type.includes_medications() {
            store.find::<Medication>(&owned).await.map(Some)
        } else {
            Ok(None)
        }
    };
    let measurements = async {
        if report_type.includes_measurements() {
            store.find::<Measurement>(&newest).await.map(Some)
        } else {
            Ok(None)
        }
    };
    let (user, medications, measurements) = tokio::try_join!(
        UserRecord::find_by_id(store, user_id),
        medications,
        measurements,
    )?;

    Ok(Report {
        title: report_type.title(),
        report_type,
        generated_at: now,
        user: ReportOwner {
            name: user.name,
            email: user.email,
        },
        medications: medications.map(|meds| meds.into_iter().map(|m| view(m, now)).collect()),
        measurements: measurements.map(|all| {
            let mut grouped: BTreeMap<MeasurementType, Vec<Measurement>> = BTreeMap::new();
            for m in all {
                grouped.entry(m.kind).or_default().push(m);
            }
            grouped
        }),
    })
}
