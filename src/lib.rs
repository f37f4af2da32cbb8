//! # t212-export
//!
//! Client for the Trading 212 public API that fetches account state and
//! exports trading history to CSV.
//!
//! A history export is asynchronous upstream: the client submits a job for a
//! trailing time window, polls the job list under a bounded attempt budget
//! (backing off when rate limited), then downloads the finished report and
//! writes it to `History Report <id>.csv`. Every stage can be cancelled
//! through a [`CancellationToken`](tokio_util::sync::CancellationToken).
//!
//! ## Quick Start
//!
//! ```no_run
//! use t212_export::{Config, EnvFileCredentials, Trading212Client};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let credentials = EnvFileCredentials::new(".env");
//!     let client = Trading212Client::new(config, &credentials)?;
//!
//!     // Subscribe to export progress
//!     let mut events = client.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let cancel = CancellationToken::new();
//!     match client.download_report(&cancel).await? {
//!         Some(path) => println!("saved {}", path.display()),
//!         None => println!("no activity in the window"),
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Trading 212 client facade
pub mod client;
/// Configuration types
pub mod config;
/// Credential providers
pub mod credentials;
/// Error types
pub mod error;
/// History export pipeline
pub mod export;
/// Rate-limit backoff
pub mod retry;
/// Authenticated request transport
pub mod transport;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use client::Trading212Client;
pub use config::{Config, Environment};
pub use credentials::{
    CredentialProvider, Credentials, EnvCredentials, EnvFileCredentials, StaticCredentials,
};
pub use error::{ApiError, Error, ErrorDetail, ExportError, Result, ToHttpStatus, TransportError};
pub use retry::IsRetryable;
pub use transport::{HttpTransport, Transport};
pub use types::{Event, ExportJob, JobStatus, MaterializeOutcome, ReportId, SyncSummary};

use tokio_util::sync::CancellationToken;

/// Cancel `token` once a termination signal arrives
///
/// Spawns a background task, so the caller can keep passing the token into
/// client calls and the API server.
///
/// Listens for Ctrl+C everywhere and additionally for SIGTERM on Unix.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => token.cancel(),
            _ = token.cancelled() => {}
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM, cancelling"),
                _ = tokio::signal::ctrl_c() => tracing::info!("Received Ctrl+C, cancelling"),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for Ctrl+C only");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C, cancelling");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, cancelling"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
