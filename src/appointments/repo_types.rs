use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{Collection, Record};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
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
    /// Set once the reminder has been acknowledged.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub reminded_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record for Appointment {
    const COLLECTION: Collection = Collection::Appointments;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn sort_at(&self) -> OffsetDateTime {
        self.appointment_date
    }
}
