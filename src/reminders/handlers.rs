use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::schedule::{due_within, horizon, Reminder, ReminderPolicy, Window};
use crate::{
    appointments::repo_types::Appointment,
    auth::AuthUser,
    error::ApiResult,
    medications::repo_types::Medication,
    state::AppState,
    store::{RecordQuery, StoreError},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reminders", get(list_reminders))
        .route("/reminders/upcoming", get(upcoming_reminders))
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub from: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub until: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct HorizonQuery {
    pub hours: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReminderList {
    #[serde(with = "time::serde::rfc3339")]
    pub from: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub until: OffsetDateTime,
    pub reminders: Vec<Reminder>,
}

/// Reminders for `user_id` due inside `window`.
pub async fn reminders_for(state: &AppState, user_id: Uuid, window: Window) -> Result<Vec<Reminder>, StoreError> {
    let store = state.store.as_ref();
    let med_query = RecordQuery::owned_by(user_id);
    // appointments before the window start never produce a reminder
    let appt_query = RecordQuery::owned_by(user_id).since(window.start());
    let (meds, appts) = tokio::try_join!(
        store.find::<Medication>(&med_query),
        store.find::<Appointment>(&appt_query),
    )?;
    let policy = ReminderPolicy::from(&state.config.reminders);
    Ok(due_within(&meds, &appts, window, &policy))
}

#[instrument(skip(state))]
pub async fn list_reminders(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<WindowQuery>,
) -> ApiResult<Json<ReminderList>> {
    let from = q.from.unwrap_or_else(OffsetDateTime::now_utc);
    let window = match q.until {
        Some(until) => Window::new(from, until)?,
        None => Window::starting_at(from, horizon(state.config.reminders.upcoming_hours)?),
    };
    let reminders = reminders_for(&state, user_id, window).await?;
    debug!(%user_id, count = reminders.len(), "reminders computed");
    Ok(Json(ReminderList {
        from: window.start(),
        until: window.end(),
        reminders,
    }))
}

#[instrument(skip(state))]
pub async fn upcoming_reminders(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<HorizonQuery>,
) -> ApiResult<Json<ReminderList>> {
    let span = horizon(q.hours.unwrap_or(state.config.reminders.upcoming_hours))?;
    let window = Window::starting_at(OffsetDateTime::now_utc(), span);
    let reminders = reminders_for(&state, user_id, window).await?;
    Ok(Json(ReminderList {
        from: window.start(),
        until: window.end(),
        reminders,
    }))
}
