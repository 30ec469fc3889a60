//! Partial-update fields that tell "absent" apart from an explicit `null`.
//!
//! Used with `#[serde(default, deserialize_with = "...")]`: a missing key
//! stays `None`, `null` becomes `Some(None)` and a value `Some(Some(v))`.

use serde::{Deserialize, Deserializer};
use time::OffsetDateTime;

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn rfc3339<'de, D>(deserializer: D) -> Result<Option<Option<OffsetDateTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    time::serde::rfc3339::option::deserialize(deserializer).map(Some)
}
