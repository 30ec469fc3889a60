use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Dependent, EmergencyContact, UserRecord};
use crate::{
    appointments::repo_types::Appointment,
    measurements::repo_types::{Measurement, MeasurementType},
    medications::dto::MedicationView,
};

/// Profile as returned to its owner; credentials and push token stay out.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub blood_type: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub emergency_contact: Option<EmergencyContact>,
    pub dependents: Vec<Dependent>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<UserRecord> for UserProfile {
    fn from(u: UserRecord) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            phone: u.phone,
            gender: u.gender,
            date_of_birth: u.date_of_birth,
            blood_type: u.blood_type,
            height: u.height,
            weight: u.weight,
            emergency_contact: u.emergency_contact,
            dependents: u.dependents,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub blood_type: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub emergency_contact: Option<EmergencyContact>,
}

#[derive(Debug, Deserialize)]
pub struct DependentsUpdate {
    pub dependents: Vec<Dependent>,
}

#[derive(Debug, Deserialize)]
pub struct FcmTokenUpdate {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HomeData {
    pub user_name: String,
    pub upcoming_medications: Vec<MedicationView>,
    pub next_appointment: Option<Appointment>,
    pub current_medications: Vec<MedicationView>,
    pub latest_measurements: BTreeMap<MeasurementType, Measurement>,
}
