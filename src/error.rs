//! Error types for t212-export
//!
//! This module provides the error handling for the library, including:
//! - Transport outcomes (rate limiting, failed requests, connection faults)
//! - Export job failures (missing report id, timeouts, aborted polls)
//! - HTTP status code mapping for the REST front end
//! - Structured error responses with machine-readable error codes

use crate::types::ReportId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for t212-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for t212-export
///
/// Every failure kind surfaces distinctly so an outer layer can map it to an
/// appropriate response. None of them leave a client unusable.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll.max_attempts")
        key: Option<String>,
    },

    /// Identity or secret missing for the named provider
    #[error("credentials missing for provider {provider}")]
    CredentialsMissing {
        /// Provider name the credentials were requested for (e.g., "Trading212")
        provider: String,
    },

    /// Upstream request did not produce a usable response
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Export job submission or polling failed
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// The finished report could not be fetched or written
    #[error("failed to materialize report {report_id}: {cause}")]
    Materialize {
        /// Report whose artifact failed
        report_id: ReportId,
        /// Underlying fault
        cause: String,
    },

    /// The caller's cancellation token fired before the operation completed
    #[error("operation cancelled")]
    Cancelled,

    /// Another export flow is already running on this server
    #[error("an export is already in progress")]
    ExportInProgress,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Classified outcome of a failed upstream call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Upstream answered HTTP 429
    #[error("rate limited by upstream")]
    RateLimited {
        /// Seconds to wait, from the upstream `Retry-After` header when present
        retry_after: Option<u64>,
    },

    /// Upstream answered with a non-200, non-429 status
    #[error("request failed with status {status}: {body}")]
    RequestFailed {
        /// HTTP status code
        status: u16,
        /// Response body text
        body: String,
    },

    /// Connection failure, timeout, or malformed response
    #[error("transport fault: {cause}")]
    Fault {
        /// Description of the fault
        cause: String,
        /// The request ran out of time rather than failing outright
        timeout: bool,
    },
}

impl TransportError {
    /// Build a `Fault` from anything displayable
    pub fn fault(cause: impl std::fmt::Display) -> Self {
        Self::Fault {
            cause: cause.to_string(),
            timeout: false,
        }
    }

    /// Build a `Fault` for a request that timed out
    pub fn timeout(cause: impl std::fmt::Display) -> Self {
        Self::Fault {
            cause: cause.to_string(),
            timeout: true,
        }
    }
}

/// Export job errors (submission and completion polling)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExportError {
    /// Submission succeeded but the response carried no usable `reportId`
    #[error("export response did not contain a report id")]
    NoReportId,

    /// The poll budget ran out before the job finished
    #[error("report {report_id} not finished after {attempts} attempts")]
    TimedOut {
        /// Report being awaited
        report_id: ReportId,
        /// Number of status queries issued
        attempts: u32,
    },

    /// Rate limiting persisted until the poll budget ran out
    #[error("report {report_id} polling rate limited after {attempts} attempts")]
    RateLimited {
        /// Report being awaited
        report_id: ReportId,
        /// Number of status queries issued
        attempts: u32,
    },

    /// An unrecoverable transport error stopped polling
    #[error("polling report {report_id} aborted: {cause}")]
    Aborted {
        /// Report being awaited
        report_id: ReportId,
        /// Underlying transport error
        cause: String,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "export_timed_out",
///     "message": "export error: report 7 not finished after 10 attempts",
///     "details": {
///       "report_id": 7,
///       "attempts": 10
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "rate_limited", "credentials_missing")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - caller has to fix something before retrying
            Error::Config { .. } => 400,
            Error::CredentialsMissing { .. } => 400,

            // 409 Conflict
            Error::ExportInProgress => 409,

            // 422 Unprocessable Entity
            Error::Export(ExportError::NoReportId) => 422,

            // 429 Too Many Requests
            Error::Transport(TransportError::RateLimited { .. }) => 429,
            Error::Export(ExportError::RateLimited { .. }) => 429,

            // 502 Bad Gateway - upstream failures
            Error::Transport(TransportError::RequestFailed { .. }) => 502,
            Error::Transport(TransportError::Fault { .. }) => 502,
            Error::Export(ExportError::Aborted { .. }) => 502,
            Error::Materialize { .. } => 502,

            // 504 Gateway Timeout
            Error::Export(ExportError::TimedOut { .. }) => 504,
            Error::Cancelled => 504,

            // 500 Internal Server Error
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::CredentialsMissing { .. } => "credentials_missing",
            Error::Transport(e) => match e {
                TransportError::RateLimited { .. } => "rate_limited",
                TransportError::RequestFailed { .. } => "upstream_request_failed",
                TransportError::Fault { .. } => "transport_fault",
            },
            Error::Export(e) => match e {
                ExportError::NoReportId => "no_report_id",
                ExportError::TimedOut { .. } => "export_timed_out",
                ExportError::RateLimited { .. } => "export_rate_limited",
                ExportError::Aborted { .. } => "export_aborted",
            },
            Error::Materialize { .. } => "materialize_failed",
            Error::Cancelled => "cancelled",
            Error::ExportInProgress => "export_in_progress",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::CredentialsMissing { provider } => Some(serde_json::json!({
                "provider": provider,
            })),
            Error::Transport(TransportError::RateLimited {
                retry_after: Some(secs),
            }) => Some(serde_json::json!({
                "retry_after_secs": secs,
            })),
            Error::Transport(TransportError::RequestFailed { status, .. }) => {
                Some(serde_json::json!({
                    "upstream_status": status,
                }))
            }
            Error::Export(ExportError::TimedOut {
                report_id,
                attempts,
            })
            | Error::Export(ExportError::RateLimited {
                report_id,
                attempts,
            }) => Some(serde_json::json!({
                "report_id": report_id,
                "attempts": attempts,
            })),
            Error::Export(ExportError::Aborted { report_id, .. })
            | Error::Materialize { report_id, .. } => Some(serde_json::json!({
                "report_id": report_id,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
