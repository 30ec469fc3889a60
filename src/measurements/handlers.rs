use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateMeasurementRequest, ListQuery, StatsQuery},
    repo_types::{Measurement, MeasurementStatus, MeasurementType},
    services::{latest_by_type, new_measurement, parse_bound},
    stats::{blood_pressure_stats, blood_sugar_stats, BloodPressureStats, BloodSugarStats},
};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
    store::RecordQuery,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/measurements", get(list_measurements).post(create_measurement))
        .route("/measurements/latest", get(latest_measurements))
        .route("/measurements/stats/blood-pressure", get(blood_pressure_summary))
        .route("/measurements/stats/blood-sugar", get(blood_sugar_summary))
        .route(
            "/measurements/:id",
            get(get_measurement).delete(delete_measurement),
        )
}

#[instrument(skip(state))]
pub async fn list_measurements(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<Vec<Measurement>>> {
    if !(1..=100).contains(&q.limit) {
        return Err(ApiError::validation("limit must be between 1 and 100"));
    }
    let mut query = RecordQuery::owned_by(user_id).newest_first().limit(q.limit);
    if let Some(kind) = q.kind {
        query = query.matching("type", kind.as_str());
    }
    if let Some(start) = q.start.as_deref() {
        query = query.since(parse_bound(start, false)?);
    }
    if let Some(end) = q.end.as_deref() {
        query = query.before(parse_bound(end, true)?);
    }
    if let (Some(from), Some(until)) = (query.from, query.until) {
        if from > until {
            return Err(ApiError::validation("start must not be after end"));
        }
    }
    Ok(Json(state.store.find::<Measurement>(&query).await?))
}

#[instrument(skip(state))]
pub async fn latest_measurements(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<BTreeMap<MeasurementType, Measurement>>> {
    Ok(Json(latest_by_type(state.store.as_ref(), user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_measurement(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMeasurementRequest>,
) -> ApiResult<impl IntoResponse> {
    let m = new_measurement(user_id, payload, OffsetDateTime::now_utc())?;
    let m = state.store.save(&m).await?;
    if m.status == MeasurementStatus::Anomaly {
        warn!(%user_id, measurement_id = %m.id, kind = %m.kind, "anomalous reading recorded");
    } else {
        info!(%user_id, measurement_id = %m.id, kind = %m.kind, "measurement recorded");
    }
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/measurements/{}", m.id))],
        Json(m),
    ))
}

#[instrument(skip(state))]
pub async fn get_measurement(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Measurement>> {
    Ok(Json(state.store.fetch::<Measurement>(user_id, id).await?))
}

#[instrument(skip(state))]
pub async fn delete_measurement(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.remove::<Measurement>(user_id, id).await?;
    info!(%user_id, measurement_id = %id, "measurement deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn recent(state: &AppState, user_id: Uuid, kind: MeasurementType, days: i64) -> ApiResult<Vec<Measurement>> {
    if !(1..=3650).contains(&days) {
        return Err(ApiError::validation("days must be between 1 and 3650"));
    }
    let query = RecordQuery::owned_by(user_id)
        .matching("type", kind.as_str())
        .since(OffsetDateTime::now_utc() - Duration::days(days));
    Ok(state.store.find::<Measurement>(&query).await?)
}

#[instrument(skip(state))]
pub async fn blood_pressure_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<StatsQuery>,
) -> ApiResult<Json<BloodPressureStats>> {
    let readings = recent(&state, user_id, MeasurementType::BloodPressure, q.days).await?;
    Ok(Json(blood_pressure_stats(&readings, q.days)))
}

#[instrument(skip(state))]
pub async fn blood_sugar_summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<StatsQuery>,
) -> ApiResult<Json<BloodSugarStats>> {
    let readings = recent(&state, user_id, MeasurementType::BloodSugar, q.days).await?;
    Ok(Json(blood_sugar_stats(&readings, q.days)))
}
