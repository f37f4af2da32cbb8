//! Artifact download and storage
//!
//! A finished report is fetched from its download link and written verbatim
//! to `<report_dir>/History Report <id>.csv`. The payload first lands in a
//! `.part` sibling and is renamed into place, so readers never observe a
//! partial file. Payloads without a single data row are reported as
//! [`MaterializeOutcome::Empty`] and leave nothing behind.

use super::until_cancelled;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::{MaterializeOutcome, ReportId};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

const FILE_PREFIX: &str = "History Report ";
const FILE_EXTENSION: &str = "csv";

/// Deterministic location of a report inside `report_dir`
pub fn report_path(report_dir: &Path, report_id: ReportId) -> PathBuf {
    report_dir.join(format!("{FILE_PREFIX}{report_id}.{FILE_EXTENSION}"))
}

/// Download the artifact at `download_link` and store it for `report_id`
///
/// # Errors
/// - `Error::Materialize` when the fetch or the write fails
/// - `Error::Cancelled` when `cancel` fires during the download
pub async fn materialize(
    transport: &dyn Transport,
    download_link: &str,
    report_id: ReportId,
    report_dir: &Path,
    cancel: &CancellationToken,
) -> Result<MaterializeOutcome> {
    let payload = until_cancelled(cancel, transport.fetch(download_link))
        .await?
        .map_err(|e| Error::Materialize {
            report_id,
            cause: e.to_string(),
        })?;

    if !has_data_rows(&payload) {
        tracing::info!(report_id = %report_id, bytes = payload.len(), "Report has no rows, nothing written");
        return Ok(MaterializeOutcome::Empty);
    }

    let path = report_path(report_dir, report_id);
    write_atomically(report_dir, &path, &payload)
        .await
        .map_err(|e| Error::Materialize {
            report_id,
            cause: format!("failed to write {}: {}", path.display(), e),
        })?;

    tracing::info!(report_id = %report_id, path = %path.display(), bytes = payload.len(), "Report saved");
    Ok(MaterializeOutcome::Stored { path })
}

/// True when the CSV payload holds at least one record after its header
fn has_data_rows(payload: &[u8]) -> bool {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(payload);
    let mut record = csv::ByteRecord::new();
    loop {
        match reader.read_byte_record(&mut record) {
            Ok(true) if record.iter().all(|field| field.is_empty()) => continue,
            Ok(true) => return true,
            Ok(false) => return false,
            // Undecodable content still counts as content
            Err(_) => return true,
        }
    }
}

async fn write_atomically(dir: &Path, path: &Path, payload: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    tokio::fs::write(&part, payload).await?;
    if let Err(e) = tokio::fs::rename(&part, path).await {
        tokio::fs::remove_file(&part).await.ok();
        return Err(e);
    }
    Ok(())
}

/// Saved report files in `report_dir`, newest first
///
/// A missing directory yields an empty list.
pub async fn saved_reports(report_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(report_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut reports: Vec<(SystemTime, PathBuf)> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_report = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(FILE_PREFIX))
            && path.extension().is_some_and(|ext| ext == FILE_EXTENSION);
        if !is_report {
            continue;
        }
        let modified = entry
            .metadata()
            .await?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);
        reports.push((modified, path));
    }

    reports.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
    Ok(reports.into_iter().map(|(_, path)| path).collect())
}
