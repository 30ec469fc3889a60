use serde::Deserialize;
use time::OffsetDateTime;

#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub appointment_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub reminder_time: Option<OffsetDateTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; `null` clears an optional field.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub doctor_name: Option<Option<String>>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub appointment_date: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "crate::nullable::rfc3339")]
    pub reminder_time: Option<Option<OffsetDateTime>>,
    #[serde(default, deserialize_with = "crate::nullable::deserialize")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    5
}
