use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{macros::format_description, OffsetDateTime, Time};
use uuid::Uuid;

use crate::store::{Collection, Record};

/// A wall-clock dose slot, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(pub Time);

impl TimeOfDay {
    pub fn hm(hour: u8, minute: u8) -> Option<Self> {
        Time::from_hms(hour, minute, 0).ok().map(Self)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = format_description!("[hour]:[minute]");
        Time::parse(s.trim(), format)
            .map(Self)
            .map_err(|_| format!("invalid time of day {s:?}, expected HH:MM"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Sorts and de-duplicates dose slots.
pub fn normalize_slots(mut slots: Vec<TimeOfDay>) -> Vec<TimeOfDay> {
    slots.sort();
    slots.dedup();
    slots
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dosage: String,
    /// Hours between doses.
    pub frequency: i64,
    #[serde(default)]
    pub times_of_day: Vec<TimeOfDay>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Doses on hand.
    #[serde(default)]
    pub refill_quantity: Option<u32>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_taken: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Record for Medication {
    const COLLECTION: Collection = Collection::Medications;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn sort_at(&self) -> OffsetDateTime {
        self.start_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_parses_and_prints_hh_mm() {
        let t: TimeOfDay = "08:05".parse().unwrap();
        assert_eq!(t, TimeOfDay::hm(8, 5).unwrap());
        assert_eq!(t.to_string(), "08:05");
        assert!("8pm".parse::<TimeOfDay>().is_err());
        assert!("24:00".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn slots_are_sorted_and_deduplicated() {
        let slots = ["20:00", "08:00", "20:00"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let slots = normalize_slots(slots);
        assert_eq!(slots, vec![TimeOfDay::hm(8, 0).unwrap(), TimeOfDay::hm(20, 0).unwrap()]);
        assert_eq!(serde_json::to_value(&slots).unwrap(), serde_json::json!(["08:00", "20:00"]));
    }
}
