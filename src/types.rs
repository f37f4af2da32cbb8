//! Core types for t212-export

use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;
use utoipa::ToSchema;

/// Identifier of a server-side export job (`reportId` upstream)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct ReportId(pub i64);

impl ReportId {
    /// Create a new ReportId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ReportId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<ReportId> for i64 {
    fn from(id: ReportId) -> Self {
        id.0
    }
}

impl PartialEq<i64> for ReportId {
    fn eq(&self, other: &i64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ReportId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Data categories included in a history export
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DataIncluded {
    /// Include dividend payments
    #[serde(rename = "includeDividends")]
    pub dividends: bool,
    /// Include interest on cash
    #[serde(rename = "includeInterest")]
    pub interest: bool,
    /// Include orders
    #[serde(rename = "includeOrders")]
    pub orders: bool,
    /// Include deposits, withdrawals and other transactions
    #[serde(rename = "includeTransactions")]
    pub transactions: bool,
}

impl DataIncluded {
    /// Every category enabled
    pub const fn all() -> Self {
        Self {
            dividends: true,
            interest: true,
            orders: true,
            transactions: true,
        }
    }
}

impl Default for DataIncluded {
    fn default() -> Self {
        Self::all()
    }
}

/// Body of `POST /equity/history/exports`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    /// Categories to include
    pub data_included: DataIncluded,
    /// Window start (inclusive)
    #[serde(serialize_with = "serialize_utc_seconds")]
    pub time_from: DateTime<Utc>,
    /// Window end
    #[serde(serialize_with = "serialize_utc_seconds")]
    pub time_to: DateTime<Utc>,
}

impl ExportRequest {
    /// Build a request for the trailing `lookback` window ending at `time_to`
    pub fn trailing(
        time_to: DateTime<Utc>,
        lookback: chrono::Duration,
        data_included: DataIncluded,
    ) -> Self {
        // Upstream works in whole seconds
        let time_to = time_to.with_nanosecond(0).unwrap_or(time_to);
        Self {
            data_included,
            time_from: time_to
                .checked_sub_signed(lookback)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            time_to,
        }
    }
}

/// Format a timestamp as `YYYY-MM-DDTHH:MM:SSZ`
pub fn format_utc_seconds(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn serialize_utc_seconds<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_utc_seconds(ts))
}

/// Status of a server-side export job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum JobStatus {
    /// Queued or still being compiled
    #[serde(alias = "Queued", alias = "Processing", alias = "Running")]
    Pending,
    /// Report ready for download
    Finished,
    /// Any status string this client does not recognize
    #[serde(other)]
    Unknown,
}

/// One entry of `GET /equity/history/exports`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    /// Job identifier
    pub report_id: ReportId,
    /// Current status
    pub status: JobStatus,
    /// Download link once finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
}

/// Result of materializing a finished report
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MaterializeOutcome {
    /// Report written to disk
    Stored {
        /// Path of the written file
        #[schema(value_type = String)]
        path: PathBuf,
    },
    /// Report had no rows; nothing written
    Empty,
}

/// Combined result of a cash fetch followed by a report download
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncSummary {
    /// Account cash snapshot as returned upstream
    #[schema(value_type = Object)]
    pub cash: serde_json::Value,
    /// Saved report path, absent when the report was empty
    #[schema(value_type = Option<String>)]
    pub report: Option<PathBuf>,
}

/// Event emitted during the export lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Export job accepted upstream
    ExportSubmitted {
        /// Report ID
        report_id: ReportId,
        /// Window start (`YYYY-MM-DDTHH:MM:SSZ`)
        time_from: String,
        /// Window end (`YYYY-MM-DDTHH:MM:SSZ`)
        time_to: String,
    },

    /// Status query issued
    PollAttempt {
        /// Report ID
        report_id: ReportId,
        /// Attempt number, starting at 1
        attempt: u32,
        /// Attempt budget
        max_attempts: u32,
    },

    /// Job found but not finished yet
    ReportPending {
        /// Report ID
        report_id: ReportId,
        /// Attempt number
        attempt: u32,
        /// Reported status
        status: JobStatus,
    },

    /// Status query was rate limited
    PollRateLimited {
        /// Report ID
        report_id: ReportId,
        /// Attempt number
        attempt: u32,
        /// Extra delay before the next query in milliseconds
        backoff_ms: u64,
    },

    /// Job finished and a download link is available
    ExportFinished {
        /// Report ID
        report_id: ReportId,
        /// Download link
        download_link: String,
    },

    /// Job did not finish (timed out, rate limited, aborted or cancelled)
    ExportFailed {
        /// Report ID
        report_id: ReportId,
        /// Error message
        error: String,
    },

    /// Report written to disk
    ReportSaved {
        /// Report ID
        report_id: ReportId,
        /// Written path
        #[schema(value_type = String)]
        path: PathBuf,
    },

    /// Report had no rows
    ReportEmpty {
        /// Report ID
        report_id: ReportId,
    },
}

impl Event {
    /// Event name, matching the serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ExportSubmitted { .. } => "export_submitted",
            Event::PollAttempt { .. } => "poll_attempt",
            Event::ReportPending { .. } => "report_pending",
            Event::PollRateLimited { .. } => "poll_rate_limited",
            Event::ExportFinished { .. } => "export_finished",
            Event::ExportFailed { .. } => "export_failed",
            Event::ReportSaved { .. } => "report_saved",
            Event::ReportEmpty { .. } => "report_empty",
        }
    }
}
