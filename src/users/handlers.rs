use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{DependentsUpdate, FcmTokenUpdate, HomeData, MessageResponse, UserProfile, UserUpdate},
    repo_types::{EmergencyContact, UserRecord},
    services::{apply_update, validate_contact, validate_dependents},
};
use crate::{
    appointments::repo_types::Appointment,
    auth::AuthUser,
    error::{ApiError, ApiResult},
    measurements::services::latest_by_type,
    medications::{handlers::upcoming, repo_types::Medication, services::view},
    reminders::schedule::{ended_before, horizon, Window},
    state::AppState,
    store::{RecordQuery, StoreError},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/:id", get(get_profile).put(update_profile).delete(delete_account))
        .route("/users/:id/dependents", put(update_dependents))
        .route("/users/:id/fcm-token", post(update_fcm_token))
        .route("/users/:id/emergency-contact", post(update_emergency_contact))
        .route("/home", get(home))
}

/// Users may only address their own profile.
fn ensure_self(caller: Uuid, id: Uuid) -> ApiResult<()> {
    if caller != id {
        warn!(%caller, target = %id, "profile access denied");
        return Err(ApiError::Forbidden("Not allowed to access another user's profile".into()));
    }
    Ok(())
}

async fn load(state: &AppState, caller: Uuid, id: Uuid) -> ApiResult<UserRecord> {
    ensure_self(caller, id)?;
    Ok(UserRecord::find_by_id(state.store.as_ref(), id).await?)
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(load(&state, caller, id).await?.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdate>,
) -> ApiResult<Json<UserProfile>> {
    let mut user = load(&state, caller, id).await?;
    if let Some(email) = apply_update(&mut user, payload, OffsetDateTime::now_utc())? {
        if UserRecord::find_by_email(state.store.as_ref(), &email).await?.is_some() {
            return Err(ApiError::Conflict("Email already registered".into()));
        }
    }
    let user = state.store.save(&user).await.map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::Conflict("Email already registered".into()),
        other => other.into(),
    })?;
    info!(user_id = %id, "profile updated");
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ensure_self(caller, id)?;
    let removed = UserRecord::delete_cascade(state.store.as_ref(), id).await?;
    info!(user_id = %id, removed, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn update_dependents(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DependentsUpdate>,
) -> ApiResult<Json<UserProfile>> {
    validate_dependents(&payload.dependents)?;
    let mut user = load(&state, caller, id).await?;
    user.dependents = payload.dependents;
    user.updated_at = OffsetDateTime::now_utc();
    Ok(Json(state.store.save(&user).await?.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_fcm_token(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<FcmTokenUpdate>,
) -> ApiResult<Json<MessageResponse>> {
    let token = payload.token.trim();
    if token.is_empty() {
        return Err(ApiError::validation("token must not be empty"));
    }
    let mut user = load(&state, caller, id).await?;
    user.fcm_token = Some(token.to_string());
    user.updated_at = OffsetDateTime::now_utc();
    state.store.save(&user).await?;
    Ok(Json(MessageResponse {
        message: "FCM token updated successfully",
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_emergency_contact(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EmergencyContact>,
) -> ApiResult<Json<UserProfile>> {
    validate_contact(&payload)?;
    let mut user = load(&state, caller, id).await?;
    user.emergency_contact = Some(payload);
    user.updated_at = OffsetDateTime::now_utc();
    Ok(Json(state.store.save(&user).await?.into()))
}

#[instrument(skip(state))]
pub async fn home(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<HomeData>> {
    let now = OffsetDateTime::now_utc();
    let store = state.store.as_ref();
    let med_query = RecordQuery::owned_by(user_id);
    let appt_query = RecordQuery::owned_by(user_id).since(now).limit(1);
    let (user, meds, next_appointment, latest_measurements) = tokio::try_join!(
        UserRecord::find_by_id(store, user_id),
        store.find::<Medication>(&med_query),
        store.find_one::<Appointment>(appt_query),
        latest_by_type(store, user_id),
    )?;

    let current_medications = meds
        .iter()
        .filter(|m| !ended_before(m, now))
        .take(5)
        .cloned()
        .map(|m| view(m, now))
        .collect();
    let span = horizon(state.config.reminders.upcoming_hours)?;
    let upcoming_medications = upcoming(meds, Window::starting_at(now, span), 3);

    Ok(Json(HomeData {
        user_name: user.name,
        upcoming_medications,
        next_appointment,
        current_medications,
        latest_measurements,
    }))
}
