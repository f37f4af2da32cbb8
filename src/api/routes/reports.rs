//! Report handlers.

use super::{ReportFile, ReportListResponse, ReportResponse};
use crate::api::AppState;
use crate::error::Result;
use axum::{Json, extract::State};

/// POST /reports - Run a history export and save the report
///
/// Blocks until the report is saved, found empty, or the export fails.
#[utoipa::path(
    post,
    path = "/reports",
    tag = "reports",
    responses(
        (status = 200, description = "Export completed", body = ReportResponse),
        (status = 400, description = "Credentials missing", body = crate::error::ApiError),
        (status = 409, description = "Another export is running", body = crate::error::ApiError),
        (status = 422, description = "Export response had no report id", body = crate::error::ApiError),
        (status = 429, description = "Rate limited upstream", body = crate::error::ApiError),
        (status = 502, description = "Upstream request or download failed", body = crate::error::ApiError),
        (status = 504, description = "Export did not finish in time", body = crate::error::ApiError)
    )
)]
pub async fn create_report(State(state): State<AppState>) -> Result<Json<ReportResponse>> {
    let _slot = state.try_begin_export()?;
    let deadline = state.request_deadline();

    let saved = state.client.download_report(deadline.token()).await?;
    Ok(Json(ReportResponse {
        saved: saved.is_some(),
        file: saved.as_deref().map(ReportFile::from_path),
    }))
}

/// GET /reports - List saved reports
#[utoipa::path(
    get,
    path = "/reports",
    tag = "reports",
    responses(
        (status = 200, description = "Saved reports, newest first", body = ReportListResponse),
        (status = 500, description = "Report directory unreadable", body = crate::error::ApiError)
    )
)]
pub async fn list_reports(State(state): State<AppState>) -> Result<Json<ReportListResponse>> {
    let reports = state.client.list_reports().await?;
    Ok(Json(ReportListResponse {
        reports: reports.iter().map(|p| ReportFile::from_path(p)).collect(),
    }))
}
