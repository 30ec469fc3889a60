use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateAppointmentRequest, UpcomingQuery, UpdateAppointmentRequest},
    repo_types::Appointment,
    services::{apply_update, mark_reminded, new_appointment},
};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
    store::RecordQuery,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", get(list_appointments).post(create_appointment))
        .route("/appointments/upcoming", get(upcoming_appointments))
        .route(
            "/appointments/:id",
            get(get_appointment).put(update_appointment).delete(delete_appointment),
        )
        .route("/appointments/:id/reminder", post(mark_appointment_reminded))
}

#[instrument(skip(state))]
pub async fn list_appointments(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<Appointment>>> {
    let appts = state
        .store
        .find::<Appointment>(&RecordQuery::owned_by(user_id))
        .await?;
    Ok(Json(appts))
}

#[instrument(skip(state))]
pub async fn upcoming_appointments(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<UpcomingQuery>,
) -> ApiResult<Json<Vec<Appointment>>> {
    if !(1..=100).contains(&q.limit) {
        return Err(ApiError::validation("limit must be between 1 and 100"));
    }
    let query = RecordQuery::owned_by(user_id)
        .since(OffsetDateTime::now_utc())
        .limit(q.limit);
    Ok(Json(state.store.find::<Appointment>(&query).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_appointment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateAppointmentRequest>,
) -> ApiResult<impl IntoResponse> {
    let appt = new_appointment(user_id, payload, OffsetDateTime::now_utc())?;
    let appt = state.store.save(&appt).await?;
    info!(%user_id, appointment_id = %appt.id, "appointment created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/appointments/{}", appt.id))],
        Json(appt),
    ))
}

#[instrument(skip(state))]
pub async fn get_appointment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(state.store.fetch::<Appointment>(user_id, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_appointment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAppointmentRequest>,
) -> ApiResult<Json<Appointment>> {
    let mut appt = state.store.fetch::<Appointment>(user_id, id).await?;
    apply_update(&mut appt, payload, OffsetDateTime::now_utc())?;
    Ok(Json(state.store.save(&appt).await?))
}

#[instrument(skip(state))]
pub async fn delete_appointment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.remove::<Appointment>(user_id, id).await?;
    info!(%user_id, appointment_id = %id, "appointment deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn mark_appointment_reminded(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    let mut appt = state.store.fetch::<Appointment>(user_id, id).await?;
    mark_reminded(&mut appt, OffsetDateTime::now_utc());
    Ok(Json(state.store.save(&appt).await?))
}
