//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`account`]: cash snapshot and the combined sync flow
//! - [`reports`]: history export and saved reports
//! - [`system`]: health, events, OpenAPI

use serde::{Deserialize, Serialize};
use std::path::Path;

mod account;
mod reports;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use account::*;
pub use reports::*;
pub use system::*;

// ============================================================================
// Response Types (shared across handlers)
// ============================================================================

/// Result of POST /reports
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ReportResponse {
    /// Whether a report file was written
    pub saved: bool,
    /// Written file, absent when the report had no rows
    pub file: Option<ReportFile>,
}

/// A saved report file
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ReportFile {
    /// File name, e.g. "History Report 123.csv"
    pub name: String,
    /// Full path on the server
    pub path: String,
}

impl ReportFile {
    pub(crate) fn from_path(path: &Path) -> Self {
        Self {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.display().to_string(),
        }
    }
}

/// Result of GET /reports
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ReportListResponse {
    /// Saved reports, newest first
    pub reports: Vec<ReportFile>,
}
