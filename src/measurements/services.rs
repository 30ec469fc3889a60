use std::collections::BTreeMap;

use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
};
use uuid::Uuid;

use super::{
    dto::CreateMeasurementRequest,
    repo_types::{Measurement, MeasurementType, MeasurementValue},
    status::classify,
};
use crate::{
    error::{ApiError, ApiResult},
    store::{RecordQuery, RecordStore, StoreError},
};

pub fn new_measurement(user_id: Uuid, req: CreateMeasurementRequest, now: OffsetDateTime) -> ApiResult<Measurement> {
    let is_pressure = matches!(req.value, MeasurementValue::BloodPressure { .. });
    if is_pressure != (req.kind == MeasurementType::BloodPressure) {
        return Err(ApiError::validation(format!(
            "value does not match measurement type {}",
            req.kind
        )));
    }
    if req.value.number().is_some_and(|v| !v.is_finite()) {
        return Err(ApiError::validation("value must be a finite number"));
    }

    let unit = req
        .unit
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| req.kind.default_unit().to_string());
    let status = classify(req.kind, &req.value, &unit);

    Ok(Measurement {
        id: Uuid::new_v4(),
        user_id,
        kind: req.kind,
        value: req.value,
        unit,
        timestamp: req.timestamp.unwrap_or(now),
        notes: req.notes,
        source: req.source,
        status,
        created_at: now,
    })
}

/// Parses a range bound given as RFC 3339 or `YYYY-MM-DD` (midnight UTC).
/// With `end_of_day`, a plain date moves to the following midnight.
pub fn parse_bound(raw: &str, end_of_day: bool) -> ApiResult<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(at);
    }
    let date = Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ApiError::validation(format!("invalid date {raw:?}")))?;
    let day = if end_of_day {
        date.next_day()
            .ok_or_else(|| ApiError::validation(format!("date {raw:?} is out of range")))?
    } else {
        date
    };
    Ok(day.midnight().assume_utc())
}

/// The newest measurement of each type the user has recorded.
pub async fn latest_by_type(
    store: &dyn RecordStore,
    user_id: Uuid,
) -> Result<BTreeMap<MeasurementType, Measurement>, StoreError> {
    let newest = move |kind: MeasurementType| {
        store.find_one::<Measurement>(
            RecordQuery::owned_by(user_id)
                .matching("type", kind.as_str())
                .newest_first(),
        )
    };
    let (bp, sugar, weight, temperature, heart_rate) = tokio::try_join!(
        newest(MeasurementType::BloodPressure),
        newest(MeasurementType::BloodSugar),
        newest(MeasurementType::Weight),
        newest(MeasurementType::Temperature),
        newest(MeasurementType::HeartRate),
    )?;
    Ok([bp, sugar, weight, temperature, heart_rate]
        .into_iter()
        .flatten()
        .map(|m| (m.kind, m))
        .collect())
}
