use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{Collection, Record};

/// User document. A user owns itself, so `owner_id == id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>, // YYYY-MM-DD
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub fcm_token: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub dependents: Vec<Dependent>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependent {
    pub name: String,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

impl UserRecord {
    pub fn new(email: String, password_hash: String, name: String, phone: Option<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            name,
            phone,
            gender: None,
            date_of_birth: None,
            blood_type: None,
            height: None,
            weight: None,
            fcm_token: None,
            emergency_contact: None,
            dependents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for UserRecord {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.id
    }

    fn sort_at(&self) -> OffsetDateTime {
        self.created_at
    }
}
