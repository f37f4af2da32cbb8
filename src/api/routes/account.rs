//! Account handlers.

use crate::api::AppState;
use crate::error::Result;
use crate::types::SyncSummary;
use axum::{Json, extract::State};

/// GET /account/cash - Account cash snapshot
#[utoipa::path(
    get,
    path = "/account/cash",
    tag = "account",
    responses(
        (status = 200, description = "Cash snapshot as returned by Trading 212", body = Object),
        (status = 429, description = "Rate limited upstream", body = crate::error::ApiError),
        (status = 502, description = "Upstream request failed", body = crate::error::ApiError),
        (status = 504, description = "Request deadline reached", body = crate::error::ApiError)
    )
)]
pub async fn get_cash(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let deadline = state.request_deadline();
    let cash = state.client.fetch_cash(deadline.token()).await?;
    Ok(Json(cash))
}

/// POST /sync - Fetch cash, then run a history export
#[utoipa::path(
    post,
    path = "/sync",
    tag = "account",
    responses(
        (status = 200, description = "Cash snapshot and saved report", body = SyncSummary),
        (status = 409, description = "Another export is running", body = crate::error::ApiError),
        (status = 429, description = "Rate limited upstream", body = crate::error::ApiError),
        (status = 502, description = "Upstream request failed", body = crate::error::ApiError),
        (status = 504, description = "Export did not finish in time", body = crate::error::ApiError)
    )
)]
pub async fn sync(State(state): State<AppState>) -> Result<Json<SyncSummary>> {
    let _slot = state.try_begin_export()?;
    let deadline = state.request_deadline();
    let summary = state.client.sync(deadline.token()).await?;
    Ok(Json(summary))
}
