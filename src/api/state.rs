//! Application state for the API server

use crate::error::{Error, Result};
use crate::{Config, Trading212Client};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the client and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The Trading 212 client
    pub client: Trading212Client,

    /// Configuration (read-only)
    pub config: Arc<Config>,

    /// Held for the duration of an export flow
    export_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(client: Trading212Client, config: Arc<Config>) -> Self {
        Self {
            client,
            config,
            export_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Claim the single export slot, or fail with `ExportInProgress`
    pub fn try_begin_export(&self) -> Result<MutexGuard<'_, ()>> {
        self.export_lock
            .try_lock()
            .map_err(|_| Error::ExportInProgress)
    }

    /// Cancellation token bounded by the configured request deadline
    pub fn request_deadline(&self) -> RequestDeadline {
        RequestDeadline::new(self.config.server.request_timeout)
    }
}

/// Per-request cancellation token
///
/// Fires when the deadline passes or when the handler is dropped, which
/// axum does once the client disconnects.
pub struct RequestDeadline {
    token: CancellationToken,
    _guard: DropGuard,
}

impl RequestDeadline {
    fn new(timeout: std::time::Duration) -> Self {
        let token = CancellationToken::new();
        let timer = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    tracing::warn!(timeout_secs = timeout.as_secs(), "Request deadline reached, cancelling");
                    timer.cancel();
                }
                _ = timer.cancelled() => {}
            }
        });
        Self {
            _guard: token.clone().drop_guard(),
            token,
        }
    }

    /// Token to pass into client calls
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
