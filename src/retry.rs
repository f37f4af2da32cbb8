//! Rate-limit backoff
//!
//! The poller keeps issuing status queries while upstream answers 429; each
//! consecutive rate-limited query stretches the wait before the next one
//! using exponential backoff with optional jitter.
//!
//! # Example
//!
//! ```
//! use t212_export::config::BackoffConfig;
//! use t212_export::retry::Backoff;
//! use std::time::Duration;
//!
//! let config = BackoffConfig { jitter: false, ..Default::default() };
//! let mut backoff = Backoff::new(&config);
//! assert_eq!(backoff.next_delay(None), Duration::from_secs(5));
//! assert_eq!(backoff.next_delay(None), Duration::from_secs(10));
//! backoff.reset();
//! assert_eq!(backoff.next_delay(None), Duration::from_secs(5));
//! ```

use crate::config::BackoffConfig;
use crate::error::{Error, ExportError, TransportError};
use rand::Rng;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Rate limits and timeouts clear up on their own and return `true`.
/// Bad credentials, rejected requests and local faults return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for TransportError {
    fn is_retryable(&self) -> bool {
        match self {
            TransportError::RateLimited { .. } => true,
            // 5xx is upstream trouble, 4xx is ours
            TransportError::RequestFailed { status, .. } => *status >= 500,
            TransportError::Fault { timeout, .. } => *timeout,
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_retryable(),
            Error::Export(e) => matches!(
                e,
                ExportError::TimedOut { .. } | ExportError::RateLimited { .. }
            ),
            // The in-flight export will finish eventually
            Error::ExportInProgress => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            Error::Config { .. }
            | Error::CredentialsMissing { .. }
            | Error::Materialize { .. }
            | Error::Cancelled
            | Error::Serialization(_)
            | Error::ApiServerError(_)
            | Error::Other(_) => false,
        }
    }
}

/// Consecutive rate-limit tracker producing exponentially growing delays
#[derive(Clone, Debug)]
pub struct Backoff {
    config: BackoffConfig,
    consecutive: u32,
}

impl Backoff {
    /// Start a fresh schedule
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            config: config.clone(),
            consecutive: 0,
        }
    }

    /// Number of rate-limited queries since the last reset
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// Record another rate-limited query and return the delay before the next one
    ///
    /// The delay is `initial_delay * multiplier^(n-1)` capped at `max_delay`,
    /// jittered when enabled, and never shorter than `retry_after` seconds.
    pub fn next_delay(&mut self, retry_after: Option<u64>) -> Duration {
        self.consecutive = self.consecutive.saturating_add(1);

        let exponent = (self.consecutive - 1).min(i32::MAX as u32) as i32;
        let base = self.config.initial_delay.as_secs_f64() * self.config.multiplier.powi(exponent);
        let capped = Duration::from_secs_f64(base.min(self.config.max_delay.as_secs_f64()));

        let delay = if self.config.jitter {
            add_jitter(capped).min(self.config.max_delay)
        } else {
            capped
        };

        match retry_after {
            Some(secs) => delay.max(Duration::from_secs(secs)),
            None => delay,
        }
    }

    /// Forget earlier rate limits after a successful query
    pub fn reset(&mut self) {
        self.consecutive = 0;
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay.
/// This means the actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
