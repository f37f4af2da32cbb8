//! Trading 212 client
//!
//! [`Trading212Client`] ties the transport, the export pipeline and the event
//! channel together. It holds no per-call state, so a failed call never
//! leaves it unusable, and clones share the same transport and channel.

use crate::config::Config;
use crate::credentials::CredentialProvider;
use crate::error::{Error, Result};
use crate::export::{self, until_cancelled};
use crate::transport::{HttpTransport, Method, Transport};
use crate::types::{Event, ExportRequest, MaterializeOutcome, SyncSummary, format_utc_seconds};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Upstream path of the account cash snapshot
pub const CASH_PATH: &str = "/equity/account/cash";

/// Client for account state and history exports
#[derive(Clone)]
pub struct Trading212Client {
    transport: Arc<dyn Transport>,
    config: Arc<Config>,
    event_tx: broadcast::Sender<Event>,
}

impl std::fmt::Debug for Trading212Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trading212Client")
            .field("base_url", &self.config.api_base_url())
            .field("report_dir", &self.config.storage.report_dir)
            .finish_non_exhaustive()
    }
}

impl Trading212Client {
    /// Create a client for `config`, loading credentials once from `provider`
    ///
    /// # Errors
    /// - `Error::Config` when the configuration is invalid
    /// - `Error::CredentialsMissing` when the key id or secret is absent; no
    ///   network call is made in that case
    pub fn new(config: Config, provider: &dyn CredentialProvider) -> Result<Self> {
        config.validate()?;
        let credentials = provider.get_credentials(&config.credentials.provider)?;
        let transport = HttpTransport::new(&config, &credentials)?;
        tracing::info!(
            base_url = %transport.base_url(),
            report_dir = %config.storage.report_dir.display(),
            "Trading 212 client ready"
        );
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over an existing transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _rx) = broadcast::channel(1000);
        Self {
            transport,
            config: Arc::new(config),
            event_tx,
        }
    }

    /// Subscribe to export lifecycle events
    ///
    /// Receivers that fall behind by more than the channel capacity see
    /// `RecvError::Lagged` and skip ahead.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Fetch the account cash snapshot as returned upstream
    pub async fn fetch_cash(&self, cancel: &CancellationToken) -> Result<serde_json::Value> {
        let cash = until_cancelled(cancel, self.transport.request(Method::Get, CASH_PATH, None))
            .await??;
        tracing::info!("Fetched account cash");
        Ok(cash)
    }

    /// Run a full history export and store the report
    ///
    /// Submits an export for the trailing window, waits the settle delay,
    /// polls until the report is finished and writes it to the report
    /// directory. Returns `None` when the report has no rows.
    pub async fn download_report(&self, cancel: &CancellationToken) -> Result<Option<PathBuf>> {
        let lookback = chrono::Duration::from_std(self.config.export.lookback).map_err(|e| {
            Error::Config {
                message: format!("lookback out of range: {}", e),
                key: Some("export.lookback".into()),
            }
        })?;
        let request = ExportRequest::trailing(Utc::now(), lookback, self.config.export.include);

        let report_id = export::submit_export(self.transport.as_ref(), &request, cancel).await?;
        self.emit_event(Event::ExportSubmitted {
            report_id,
            time_from: format_utc_seconds(&request.time_from),
            time_to: format_utc_seconds(&request.time_to),
        });

        let outcome = async {
            export::pause(cancel, self.config.export.settle_delay).await?;
            let link = export::await_completion(
                self.transport.as_ref(),
                report_id,
                &self.config.poll,
                &self.event_tx,
                cancel,
            )
            .await?;
            export::materialize(
                self.transport.as_ref(),
                &link,
                report_id,
                &self.config.storage.report_dir,
                cancel,
            )
            .await
        }
        .await;

        match outcome {
            Ok(MaterializeOutcome::Stored { path }) => {
                self.emit_event(Event::ReportSaved {
                    report_id,
                    path: path.clone(),
                });
                Ok(Some(path))
            }
            Ok(MaterializeOutcome::Empty) => {
                self.emit_event(Event::ReportEmpty { report_id });
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(report_id = %report_id, error = %e, "History export failed");
                self.emit_event(Event::ExportFailed {
                    report_id,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Fetch cash, then download the history report
    pub async fn sync(&self, cancel: &CancellationToken) -> Result<SyncSummary> {
        let cash = self.fetch_cash(cancel).await?;
        let report = self.download_report(cancel).await?;
        Ok(SyncSummary { cash, report })
    }

    /// Reports saved in the report directory, newest first
    pub async fn list_reports(&self) -> Result<Vec<PathBuf>> {
        export::saved_reports(&self.config.storage.report_dir).await
    }
}
