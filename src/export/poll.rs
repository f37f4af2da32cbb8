//! Report completion polling
//!
//! The poller is a small state machine driven by the job list upstream
//! exposes. Each attempt waits the poll interval (stretched by the rate-limit
//! backoff after a 429), lists export jobs and looks for the awaited report.
//!
//! | Query result                   | Next state                        |
//! |--------------------------------|-----------------------------------|
//! | report `Finished` with a link  | done, download link returned      |
//! | report missing or not finished | next attempt                      |
//! | 429                            | next attempt after backoff        |
//! | any other failure              | `Aborted`                         |
//!
//! When the budget runs out the result is `RateLimited` if the last query was
//! rate limited and `TimedOut` otherwise.

use super::{EXPORTS_PATH, pause, until_cancelled};
use crate::config::PollConfig;
use crate::error::{ExportError, Result, TransportError};
use crate::retry::Backoff;
use crate::transport::{Method, Transport};
use crate::types::{Event, ExportJob, JobStatus, ReportId};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Wait for `report_id` to finish and return its download link
///
/// Issues at most `config.max_attempts` status queries and stops at the first
/// one that shows the report as finished.
///
/// # Errors
/// - `ExportError::TimedOut` / `ExportError::RateLimited` when the budget runs out
/// - `ExportError::Aborted` on any other transport failure or a malformed job list
/// - `Error::Cancelled` when `cancel` fires
pub async fn await_completion(
    transport: &dyn Transport,
    report_id: ReportId,
    config: &PollConfig,
    events: &broadcast::Sender<Event>,
    cancel: &CancellationToken,
) -> Result<String> {
    let mut backoff = Backoff::new(&config.rate_limit_backoff);
    let mut extra_delay = Duration::ZERO;
    let mut last_rate_limited = false;

    for attempt in 1..=config.max_attempts {
        pause(cancel, config.interval.saturating_add(extra_delay)).await?;
        extra_delay = Duration::ZERO;

        tracing::debug!(report_id = %report_id, attempt, max_attempts = config.max_attempts, "Polling export status");
        events
            .send(Event::PollAttempt {
                report_id,
                attempt,
                max_attempts: config.max_attempts,
            })
            .ok();

        let reply =
            until_cancelled(cancel, transport.request(Method::Get, EXPORTS_PATH, None)).await?;

        match reply {
            Ok(list) => {
                backoff.reset();
                last_rate_limited = false;

                match find_job(list, report_id)? {
                    Some(ExportJob {
                        status: JobStatus::Finished,
                        download_link,
                        ..
                    }) => {
                        let Some(link) = download_link else {
                            return Err(ExportError::Aborted {
                                report_id,
                                cause: "finished report has no download link".into(),
                            }
                            .into());
                        };
                        tracing::info!(report_id = %report_id, attempt, "Export finished");
                        events
                            .send(Event::ExportFinished {
                                report_id,
                                download_link: link.clone(),
                            })
                            .ok();
                        return Ok(link);
                    }
                    Some(job) => {
                        tracing::debug!(report_id = %report_id, attempt, status = ?job.status, "Export not finished yet");
                        events
                            .send(Event::ReportPending {
                                report_id,
                                attempt,
                                status: job.status,
                            })
                            .ok();
                    }
                    None => {
                        tracing::debug!(report_id = %report_id, attempt, "Export not listed yet");
                    }
                }
            }
            Err(TransportError::RateLimited { retry_after }) => {
                last_rate_limited = true;
                extra_delay = backoff.next_delay(retry_after);
                tracing::warn!(
                    report_id = %report_id,
                    attempt,
                    consecutive = backoff.consecutive(),
                    backoff_ms = extra_delay.as_millis() as u64,
                    "Export status query rate limited, backing off"
                );
                events
                    .send(Event::PollRateLimited {
                        report_id,
                        attempt,
                        backoff_ms: extra_delay.as_millis() as u64,
                    })
                    .ok();
            }
            Err(e) => {
                tracing::error!(report_id = %report_id, attempt, error = %e, "Export polling aborted");
                return Err(ExportError::Aborted {
                    report_id,
                    cause: e.to_string(),
                }
                .into());
            }
        }
    }

    let attempts = config.max_attempts;
    if last_rate_limited {
        tracing::warn!(report_id = %report_id, attempts, "Export polling ended rate limited");
        Err(ExportError::RateLimited {
            report_id,
            attempts,
        }
        .into())
    } else {
        tracing::warn!(report_id = %report_id, attempts, "Export did not finish in time");
        Err(ExportError::TimedOut {
            report_id,
            attempts,
        }
        .into())
    }
}

/// Pick the entry for `report_id` out of a job list
///
/// Entries for other reports are only inspected for their id, so a job this
/// client cannot decode does not hide the awaited one.
fn find_job(list: serde_json::Value, report_id: ReportId) -> Result<Option<ExportJob>> {
    let malformed = |cause: String| ExportError::Aborted {
        report_id,
        cause: format!("malformed export list: {}", cause),
    };

    let serde_json::Value::Array(entries) = list else {
        return Err(malformed("expected an array of jobs".into()).into());
    };

    let Some(entry) = entries
        .into_iter()
        .find(|entry| entry.get("reportId").and_then(|id| id.as_i64()) == Some(report_id.get()))
    else {
        return Ok(None);
    };

    let job = serde_json::from_value(entry).map_err(|e| malformed(e.to_string()))?;
    Ok(Some(job))
}
