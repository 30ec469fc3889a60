use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repo_types::{Medication, TimeOfDay};

#[derive(Debug, Deserialize)]
pub struct CreateMedicationRequest {
    pub name: String,
    pub dosage: String,
    pub frequency: i64,
    #[serde(default)]
    pub times_of_day: Vec<TimeOfDay>,
    /// Single-slot shorthand, folded into `times_of_day`.
    #[serde(default)]
    pub preferred_time: Option<TimeOfDay>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub refill_quantity: Option<u32>,
}

/// Partial update; absent fields are left as they are and `null` clears
/// an optional field.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMedicationRequest {
    pub name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<i64>,
    pub times_of_day: Option<Vec<TimeOfDay>>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "crate::nullable::rfc3339")]
    pub end_date: Option<Option<OffsetDateTime>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub instructions: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub refill_quantity: Option<Option<u32>>,
    #[serde(default, deserialize_with = "crate::nullable::rfc3339")]
    pub last_taken: Option<Option<OffsetDateTime>>,
}

#[derive(Debug, Deserialize)]
pub struct RefillRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub hours: Option<i64>,
    #[serde(default = "default_upcoming_limit")]
    pub limit: usize,
}

fn default_upcoming_limit() -> usize {
    5
}

/// A medication with its schedule computed at response time.
#[derive(Debug, Serialize)]
pub struct MedicationView {
    #[serde(flatten)]
    pub medication: Medication,
    #[serde(with = "time::serde::rfc3339::option")]
    pub next_dose: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub refill_due: Option<OffsetDateTime>,
}
