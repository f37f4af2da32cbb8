//! History export pipeline
//!
//! An export runs in three stages that all ride on the same [`Transport`]:
//!
//! 1. [`submit`]: POST a time-windowed export request and obtain a report id
//! 2. [`poll`]: query the job list until the report is finished, the attempt
//!    budget runs out, or an unrecoverable error occurs
//! 3. [`materialize`]: download the finished artifact and commit it to disk
//!
//! Every wait and every upstream call is raced against the caller's
//! [`CancellationToken`].
//!
//! [`Transport`]: crate::transport::Transport

pub mod materialize;
pub mod poll;
pub mod submit;

pub use materialize::{materialize, report_path, saved_reports};
pub use poll::await_completion;
pub use submit::submit_export;

use crate::error::{Error, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Upstream path for submitting and listing history exports
pub const EXPORTS_PATH: &str = "/equity/history/exports";

/// Run `fut` unless `cancel` fires first
pub(crate) async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        out = fut => Ok(out),
    }
}

/// Cancellable sleep
pub(crate) async fn pause(cancel: &CancellationToken, duration: std::time::Duration) -> Result<()> {
    until_cancelled(cancel, tokio::time::sleep(duration)).await
}
