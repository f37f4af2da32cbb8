//! Export job submission

use super::{EXPORTS_PATH, until_cancelled};
use crate::error::{ExportError, Result};
use crate::transport::{Method, Transport};
use crate::types::{ExportRequest, ReportId};
use tokio_util::sync::CancellationToken;

/// Submit an export request and return the report id upstream assigned
///
/// # Errors
/// - `Error::Transport` when the POST fails (including `RateLimited`)
/// - `ExportError::NoReportId` when the response lacks an integer `reportId`
/// - `Error::Cancelled` when `cancel` fires first
pub async fn submit_export(
    transport: &dyn Transport,
    request: &ExportRequest,
    cancel: &CancellationToken,
) -> Result<ReportId> {
    let body = serde_json::to_value(request)?;
    let response = until_cancelled(
        cancel,
        transport.request(Method::Post, EXPORTS_PATH, Some(&body)),
    )
    .await??;

    let report_id = response
        .get("reportId")
        .and_then(serde_json::Value::as_i64)
        .map(ReportId::new)
        .ok_or_else(|| {
            tracing::warn!(response = %response, "Export response without reportId");
            ExportError::NoReportId
        })?;

    tracing::info!(
        report_id = %report_id,
        time_from = %body["timeFrom"],
        time_to = %body["timeTo"],
        "Export job submitted"
    );
    Ok(report_id)
}
