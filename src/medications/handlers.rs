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
    dto::{CreateMedicationRequest, MedicationView, RefillRequest, UpcomingQuery, UpdateMedicationRequest},
    repo_types::Medication,
    services::{apply_update, new_medication, refill, take_dose, view},
};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    reminders::schedule::{horizon, Window},
    state::AppState,
    store::RecordQuery,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/medications", get(list_medications).post(create_medication))
        .route("/medications/upcoming", get(upcoming_medications))
        .route(
            "/medications/:id",
            get(get_medication).put(update_medication).delete(delete_medication),
        )
        .route("/medications/:id/take", post(take_medication))
        .route("/medications/:id/refill", post(refill_medication))
}

#[instrument(skip(state))]
pub async fn list_medications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<MedicationView>>> {
    let now = OffsetDateTime::now_utc();
    let meds = state
        .store
        .find::<Medication>(&RecordQuery::owned_by(user_id))
        .await?;
    Ok(Json(meds.into_iter().map(|m| view(m, now)).collect()))
}

/// Medications with a dose due in `[now, now + hours)`, soonest first.
#[instrument(skip(state))]
pub async fn upcoming_medications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<UpcomingQuery>,
) -> ApiResult<Json<Vec<MedicationView>>> {
    let span = horizon(q.hours.unwrap_or(state.config.reminders.upcoming_hours))?;
    if !(1..=100).contains(&q.limit) {
        return Err(ApiError::validation("limit must be between 1 and 100"));
    }

    let now = OffsetDateTime::now_utc();
    let window = Window::starting_at(now, span);
    let meds = state
        .store
        .find::<Medication>(&RecordQuery::owned_by(user_id))
        .await?;
    Ok(Json(upcoming(meds, window, q.limit)))
}

pub(crate) fn upcoming(meds: Vec<Medication>, window: Window, limit: usize) -> Vec<MedicationView> {
    let mut due: Vec<MedicationView> = meds
        .into_iter()
        .map(|m| view(m, window.start()))
        .filter(|v| v.next_dose.is_some_and(|at| window.contains(at)))
        .collect();
    due.sort_by_key(|v| (v.next_dose, v.medication.id));
    due.truncate(limit);
    due
}

#[instrument(skip(state, payload))]
pub async fn create_medication(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMedicationRequest>,
) -> ApiResult<impl IntoResponse> {
    let now = OffsetDateTime::now_utc();
    let med = new_medication(user_id, payload, now)?;
    let med = state.store.save(&med).await?;
    info!(%user_id, medication_id = %med.id, "medication created");
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/v1/medications/{}", med.id))],
        Json(view(med, now)),
    ))
}

#[instrument(skip(state))]
pub async fn get_medication(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MedicationView>> {
    let med = state.store.fetch::<Medication>(user_id, id).await?;
    Ok(Json(view(med, OffsetDateTime::now_utc())))
}

#[instrument(skip(state, payload))]
pub async fn update_medication(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMedicationRequest>,
) -> ApiResult<Json<MedicationView>> {
    let now = OffsetDateTime::now_utc();
    let mut med = state.store.fetch::<Medication>(user_id, id).await?;
    apply_update(&mut med, payload, now)?;
    let med = state.store.save(&med).await?;
    Ok(Json(view(med, now)))
}

#[instrument(skip(state))]
pub async fn delete_medication(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.remove::<Medication>(user_id, id).await?;
    info!(%user_id, medication_id = %id, "medication deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn take_medication(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MedicationView>> {
    let now = OffsetDateTime::now_utc();
    let mut med = state.store.fetch::<Medication>(user_id, id).await?;
    take_dose(&mut med, now);
    let med = state.store.save(&med).await?;
    Ok(Json(view(med, now)))
}

#[instrument(skip(state, payload))]
pub async fn refill_medication(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RefillRequest>,
) -> ApiResult<Json<MedicationView>> {
    let now = OffsetDateTime::now_utc();
    let mut med = state.store.fetch::<Medication>(user_id, id).await?;
    refill(&mut med, payload.quantity, now)?;
    let med = state.store.save(&med).await?;
    info!(%user_id, medication_id = %id, quantity = payload.quantity, "medication refilled");
    Ok(Json(view(med, now)))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;
    use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};

    use crate::test_support::{app, register, send};

    fn rfc3339(at: OffsetDateTime) -> String {
        at.format(&Rfc3339).unwrap()
    }

    #[tokio::test]
    async fn crud_take_and_refill() {
        let (app, _) = app();
        let (token, _) = register(&app, "med@x.org").await;
        let start = OffsetDateTime::now_utc() - Duration::days(1);

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/v1/medications",
            Some(&token),
            Some(json!({
                "name": "Metformin",
                "dosage": "500mg",
                "frequency": 12,
                "start_date": rfc3339(start),
                "refill_quantity": 2
            })),
        )
        .await;
        assert_eq!(status, 201, "{created}");
        let id = created["id"].as_str().unwrap().to_string();
        assert!(created["next_dose"].is_string());

        let (status, taken) = send(
            &app,
            Method::POST,
            &format!("/api/v1/medications/{id}/take"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(taken["refill_quantity"], 1);
        assert!(taken["last_taken"].is_string());

        let (status, refilled) = send(
            &app,
            Method::POST,
            &format!("/api/v1/medications/{id}/refill"),
            Some(&token),
            Some(json!({"quantity": 30})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(refilled["refill_quantity"], 31);

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/medications/{id}"),
            Some(&token),
            Some(json!({"dosage": "850mg"})),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(updated["dosage"], "850mg");
        assert_eq!(updated["name"], "Metformin");

        let end = rfc3339(start + Duration::days(30));
        let (_, updated) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/medications/{id}"),
            Some(&token),
            Some(json!({"end_date": end, "instructions": "with food"})),
        )
        .await;
        assert_eq!(updated["end_date"], end.as_str());
        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/api/v1/medications/{id}"),
            Some(&token),
            Some(json!({"end_date": null, "refill_quantity": null})),
        )
        .await;
        assert_eq!(status, 200);
        assert!(updated["end_date"].is_null());
        assert!(updated["refill_quantity"].is_null());
        assert_eq!(updated["instructions"], "with food");

        let (status, list) = send(&app, Method::GET, "/api/v1/medications", Some(&token), None).await;
        assert_eq!(status, 200);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _) = send(
            &app,
            Method::DELETE,
            &format!("/api/v1/medications/{id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, 204);
        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/medications/{id}"),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, 404);
        assert_eq!(body["detail"], "Medication not found");
    }

    #[tokio::test]
    async fn other_users_cannot_see_or_touch_a_medication() {
        let (app, _) = app();
        let (owner, _) = register(&app, "owner@x.org").await;
        let (intruder, _) = register(&app, "intruder@x.org").await;

        let (_, created) = send(
            &app,
            Method::POST,
            "/api/v1/medications",
            Some(&owner),
            Some(json!({
                "name": "Aspirin",
                "dosage": "81mg",
                "frequency": 24,
                "start_date": rfc3339(OffsetDateTime::now_utc())
            })),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/medications/{id}");

        let (status, _) = send(&app, Method::GET, &uri, Some(&intruder), None).await;
        assert_eq!(status, 404);
        let (status, _) = send(&app, Method::PUT, &uri, Some(&intruder), Some(json!({"dosage": "1g"}))).await;
        assert_eq!(status, 404);
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&intruder), None).await;
        assert_eq!(status, 404);

        let (_, list) = send(&app, Method::GET, "/api/v1/medications", Some(&intruder), None).await;
        assert_eq!(list, json!([]));
        let (status, _) = send(&app, Method::GET, &uri, Some(&owner), None).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn create_rejects_bad_frequency() {
        let (app, _) = app();
        let (token, _) = register(&app, "bad@x.org").await;
        for frequency in [json!(-4), json!(8761), json!(i64::MAX)] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/api/v1/medications",
                Some(&token),
                Some(json!({
                    "name": "X",
                    "dosage": "1",
                    "frequency": frequency,
                    "start_date": rfc3339(OffsetDateTime::now_utc())
                })),
            )
            .await;
            assert_eq!(status, 400, "{frequency}");
            assert!(body["detail"].as_str().unwrap().contains("frequency"));
        }

        // nothing was stored, so listing still works
        let (status, list) = send(&app, Method::GET, "/api/v1/medications", Some(&token), None).await;
        assert_eq!(status, 200);
        assert_eq!(list, json!([]));
    }

    #[tokio::test]
    async fn upcoming_only_lists_doses_inside_the_horizon() {
        let (app, _) = app();
        let (token, _) = register(&app, "up@x.org").await;
        let now = OffsetDateTime::now_utc();
        for (name, frequency) in [("Soon", 2), ("Later", 72)] {
            send(
                &app,
                Method::POST,
                "/api/v1/medications",
                Some(&token),
                Some(json!({
                    "name": name,
                    "dosage": "1 tab",
                    "frequency": frequency,
                    "start_date": rfc3339(now)
                })),
            )
            .await;
        }

        let (status, list) = send(
            &app,
            Method::GET,
            "/api/v1/medications/upcoming?hours=24",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, 200);
        let names: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Soon"]);

        for hours in ["0", "9223372036854775807"] {
            let (status, _) = send(
                &app,
                Method::GET,
                &format!("/api/v1/medications/upcoming?hours={hours}"),
                Some(&token),
                None,
            )
            .await;
            assert_eq!(status, 400, "{hours}");
        }
    }
}
