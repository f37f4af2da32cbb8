//! Configuration types for t212-export

use crate::error::{Error, Result};
use crate::types::DataIncluded;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Trading 212 environment to talk to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Real-money account (default)
    #[default]
    Live,
    /// Practice account
    Demo,
}

impl Environment {
    /// Base URL of the public API for this environment
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Live => "https://live.trading212.com/api/v0",
            Environment::Demo => "https://demo.trading212.com/api/v0",
        }
    }
}

/// Main configuration for the Trading 212 client
///
/// Fields are grouped into sub-configs:
/// - [`export`](ExportConfig): export window and categories
/// - [`poll`](PollConfig): completion polling budget and rate-limit backoff
/// - [`storage`](StorageConfig): where reports land
/// - [`credentials`](CredentialsConfig): which provider and key file to use
/// - [`server`](ApiConfig): REST front end
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Live or demo environment (default: live)
    #[serde(default)]
    pub environment: Environment,

    /// Override for the API base URL (mock servers, proxies)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request HTTP timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Export job settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Completion polling settings
    #[serde(default)]
    pub poll: PollConfig,

    /// Report storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Credential lookup settings
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// REST API configuration
    #[serde(default)]
    pub server: ApiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            base_url: None,
            request_timeout: default_request_timeout(),
            export: ExportConfig::default(),
            poll: PollConfig::default(),
            storage: StorageConfig::default(),
            credentials: CredentialsConfig::default(),
            server: ApiConfig::default(),
        }
    }
}

impl Config {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("invalid config file {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Effective API base URL (override or environment default), without trailing slash
    pub fn api_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url())
            .trim_end_matches('/')
            .to_string()
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll.max_attempts == 0 {
            return Err(Error::Config {
                message: "must be at least 1".into(),
                key: Some("poll.max_attempts".into()),
            });
        }
        if self.export.lookback.is_zero() {
            return Err(Error::Config {
                message: "must be greater than zero".into(),
                key: Some("export.lookback".into()),
            });
        }
        if self.export.lookback > MAX_LOOKBACK {
            return Err(Error::Config {
                message: format!("must be at most {} days", MAX_LOOKBACK.as_secs() / 86_400),
                key: Some("export.lookback".into()),
            });
        }
        if self.poll.interval > MAX_WAIT {
            return Err(Error::Config {
                message: format!("must be at most {} seconds", MAX_WAIT.as_secs()),
                key: Some("poll.interval".into()),
            });
        }
        if self.poll.rate_limit_backoff.max_delay > MAX_WAIT {
            return Err(Error::Config {
                message: format!("must be at most {} seconds", MAX_WAIT.as_secs()),
                key: Some("poll.rate_limit_backoff.max_delay".into()),
            });
        }
        if self.poll.rate_limit_backoff.multiplier < 1.0 {
            return Err(Error::Config {
                message: "must be >= 1.0".into(),
                key: Some("poll.rate_limit_backoff.multiplier".into()),
            });
        }
        if let Some(url) = &self.base_url {
            url::Url::parse(url).map_err(|e| Error::Config {
                message: format!("invalid URL: {}", e),
                key: Some("base_url".into()),
            })?;
        }
        Ok(())
    }
}

/// History export settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Length of the trailing window (default: 28 days)
    #[serde(default = "default_lookback", with = "duration_serde")]
    pub lookback: Duration,

    /// Categories to include (default: all)
    #[serde(default)]
    pub include: DataIncluded,

    /// Wait between submission and the first poll (default: 2 seconds)
    #[serde(default = "default_settle_delay", with = "duration_serde")]
    pub settle_delay: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            lookback: default_lookback(),
            include: DataIncluded::all(),
            settle_delay: default_settle_delay(),
        }
    }
}

/// Completion polling settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Maximum number of status queries (default: 10)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before each status query (default: 5 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Extra delay schedule applied after a rate-limited query
    #[serde(default)]
    pub rate_limit_backoff: BackoffConfig,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval: default_poll_interval(),
            rate_limit_backoff: BackoffConfig::default(),
        }
    }
}

/// Exponential backoff configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay after the first rate-limited query (default: 5 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier applied per consecutive rate-limited query (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Report storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory reports are written to (default: current directory)
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
        }
    }
}

/// Credential lookup settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Provider name passed to the credential provider (default: "Trading212")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Dotenv file holding `T212_API_KEY` and `T212_API_SECRET` (default: ".env")
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            env_file: default_env_file(),
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,

    /// Deadline for a single request, after which in-flight exports are cancelled (default: 150 seconds)
    #[serde(default = "default_handler_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
            request_timeout: default_handler_timeout(),
        }
    }
}

/// Longest export window accepted (10 years)
const MAX_LOOKBACK: Duration = Duration::from_secs(3650 * 24 * 60 * 60);

/// Longest configured wait between status queries
const MAX_WAIT: Duration = Duration::from_secs(60 * 60);

// Default value functions
fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_lookback() -> Duration {
    Duration::from_secs(28 * 24 * 60 * 60) // 4 weeks
}

fn default_settle_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_attempts() -> u32 {
    10
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_report_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_provider() -> String {
    crate::credentials::TRADING212.to_string()
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

fn default_handler_timeout() -> Duration {
    Duration::from_secs(150)
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
