//! Test configuration helpers for building clients against mock or live upstreams

use std::path::Path;
use std::time::Duration;
use t212_export::credentials::TRADING212;
use t212_export::{
    Config, CredentialProvider, EnvFileCredentials, Environment, StaticCredentials,
    Trading212Client,
};
use tempfile::TempDir;

/// Key id the mock upstream expects
pub const TEST_KEY: &str = "test-key";

/// Secret the mock upstream expects
pub const TEST_SECRET: &str = "test-secret";

/// `Authorization` header for [`TEST_KEY`] and [`TEST_SECRET`]
pub const TEST_AUTH_HEADER: &str = "Basic dGVzdC1rZXk6dGVzdC1zZWNyZXQ=";

/// Config pointed at `base_url` with waits shortened to milliseconds
pub fn fast_config(base_url: &str, report_dir: &Path) -> Config {
    let mut config = Config {
        base_url: Some(base_url.to_string()),
        ..Default::default()
    };
    config.storage.report_dir = report_dir.to_path_buf();
    config.export.settle_delay = Duration::ZERO;
    config.poll.interval = Duration::from_millis(10);
    config.poll.rate_limit_backoff.initial_delay = Duration::from_millis(5);
    config.poll.rate_limit_backoff.max_delay = Duration::from_millis(20);
    config.poll.rate_limit_backoff.jitter = false;
    config
}

/// Client over the real HTTP transport with test credentials
pub fn create_test_client(base_url: &str) -> (Trading212Client, TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let config = fast_config(base_url, temp_dir.path());
    let client = Trading212Client::new(
        config,
        &StaticCredentials::new(Some(TEST_KEY), Some(TEST_SECRET)),
    )
    .expect("failed to create client");
    (client, temp_dir)
}

/// Whether `.env` holds Trading 212 demo keys
pub fn has_live_credentials() -> bool {
    EnvFileCredentials::new(".env")
        .get_credentials(TRADING212)
        .is_ok()
}

/// Client for the demo environment using keys from `.env`
///
/// Uses production timings, since the demo API enforces real rate limits.
pub fn create_live_client() -> (Trading212Client, TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let mut config = Config {
        environment: Environment::Demo,
        ..Default::default()
    };
    config.storage.report_dir = temp_dir.path().to_path_buf();
    let client = Trading212Client::new(config, &EnvFileCredentials::new(".env"))
        .expect("failed to create live client");
    (client, temp_dir)
}
