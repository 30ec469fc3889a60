use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{error, info, instrument};

use super::services::{build_report, ReportType};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

const LINK_TTL_SECS: u64 = 3600;

pub fn routes() -> Router<AppState> {
    Router::new().route("/reports/export", get(export_report).post(upload_report))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub report_type: ReportType,
}

#[derive(Debug, Serialize)]
pub struct UploadedReport {
    pub key: String,
    pub url: String,
    pub expires_in: u64,
}

/// The report as a downloadable JSON attachment.
#[instrument(skip(state))]
pub async fn export_report(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ExportQuery>,
) -> ApiResult<impl IntoResponse> {
    let report = build_report(state.store.as_ref(), user_id, q.report_type, OffsetDateTime::now_utc()).await?;
    let disposition = format!("attachment; filename=\"{}\"", report.file_name(user_id));
    Ok(([(header::CONTENT_DISPOSITION, disposition)], Json(report)))
}

/// Stores the report in object storage and hands back a time-limited link.
#[instrument(skip(state))]
pub async fn upload_report(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ExportQuery>,
) -> ApiResult<Json<UploadedReport>> {
    let Some(storage) = state.storage.clone() else {
        return Err(ApiError::ServiceUnavailable("Report storage is not configured".into()));
    };

    let now = OffsetDateTime::now_utc();
    let report = build_report(state.store.as_ref(), user_id, q.report_type, now).await?;
    let body = serde_json::to_vec(&report).map_err(anyhow::Error::from)?;
    let key = format!(
        "reports/{}/{}_{}.json",
        user_id,
        q.report_type.as_str(),
        now.unix_timestamp()
    );

    storage
        .put_object(&key, Bytes::from(body), "application/json")
        .await
        .map_err(|e| {
            error!(error = ?e, %key, "report upload failed");
            e
        })?;
    let url = storage.presign_get(&key, LINK_TTL_SECS).await?;
    info!(%user_id, %key, "report uploaded");

    Ok(Json(UploadedReport {
        key,
        url,
        expires_in: LINK_TTL_SECS,
    }))
}
