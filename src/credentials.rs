//! Credential lookup
//!
//! The client never stores keys itself; it asks a [`CredentialProvider`] once
//! per construction. Two stock providers read `T212_API_KEY` and
//! `T212_API_SECRET`, either from a dotenv file or from the process environment.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Provider name for Trading 212 keys
pub const TRADING212: &str = "Trading212";

/// Variable holding the Trading 212 key id
pub const KEY_VAR: &str = "T212_API_KEY";

/// Variable holding the Trading 212 secret
pub const SECRET_VAR: &str = "T212_API_SECRET";

/// Identity/secret pair for one provider
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identity: String,
    secret: String,
}

impl Credentials {
    /// Build credentials, failing with `CredentialsMissing` if either part is absent or blank
    pub fn from_parts(
        provider: &str,
        identity: Option<String>,
        secret: Option<String>,
    ) -> Result<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (present(identity), present(secret)) {
            (Some(identity), Some(secret)) => Ok(Self { identity, secret }),
            _ => Err(Error::CredentialsMissing {
                provider: provider.to_string(),
            }),
        }
    }

    /// Key id
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Secret key
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Source of credentials for a named provider
pub trait CredentialProvider: Send + Sync {
    /// Look up credentials for `provider`; `CredentialsMissing` when absent
    fn get_credentials(&self, provider: &str) -> Result<Credentials>;
}

/// Reads keys from a dotenv file without touching the process environment
#[derive(Clone, Debug)]
pub struct EnvFileCredentials {
    path: PathBuf,
}

impl EnvFileCredentials {
    /// Provider backed by the dotenv file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File this provider reads
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_vars(&self) -> HashMap<String, String> {
        let iter = match dotenvy::from_path_iter(&self.path) {
            Ok(iter) => iter,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Credential file not readable");
                return HashMap::new();
            }
        };

        let mut vars = HashMap::new();
        for item in iter {
            match item {
                Ok((key, value)) => {
                    vars.insert(key, value);
                }
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Skipping malformed credential line");
                }
            }
        }
        vars
    }
}

impl CredentialProvider for EnvFileCredentials {
    fn get_credentials(&self, provider: &str) -> Result<Credentials> {
        if provider != TRADING212 {
            return Err(Error::CredentialsMissing {
                provider: provider.to_string(),
            });
        }
        let mut vars = self.read_vars();
        Credentials::from_parts(provider, vars.remove(KEY_VAR), vars.remove(SECRET_VAR))
    }
}

/// Reads keys from the process environment
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn get_credentials(&self, provider: &str) -> Result<Credentials> {
        if provider != TRADING212 {
            return Err(Error::CredentialsMissing {
                provider: provider.to_string(),
            });
        }
        Credentials::from_parts(
            provider,
            std::env::var(KEY_VAR).ok(),
            std::env::var(SECRET_VAR).ok(),
        )
    }
}

/// Fixed credentials, for embedding and tests
#[derive(Clone, Debug)]
pub struct StaticCredentials {
    identity: Option<String>,
    secret: Option<String>,
}

impl StaticCredentials {
    /// Provider that always answers with the given parts
    pub fn new(identity: Option<&str>, secret: Option<&str>) -> Self {
        Self {
            identity: identity.map(str::to_string),
            secret: secret.map(str::to_string),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn get_credentials(&self, provider: &str) -> Result<Credentials> {
        Credentials::from_parts(provider, self.identity.clone(), self.secret.clone())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_requires_both() {
        for (identity, secret) in [
            (None, Some("s")),
            (Some("k"), None),
            (None, None),
            (Some(""), Some("s")),
            (Some("k"), Some("   ")),
        ] {
            let result = Credentials::from_parts(
                TRADING212,
                identity.map(str::to_string),
                secret.map(str::to_string),
            );
            match result {
                Err(Error::CredentialsMissing { provider }) => assert_eq!(provider, TRADING212),
                other => panic!("expected CredentialsMissing for {identity:?}/{secret:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds =
            Credentials::from_parts(TRADING212, Some("key".into()), Some("hunter2".into())).unwrap();
        let debug = format!("{creds:?}");
        assert!(debug.contains("key"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_env_file_reads_both_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# trading keys\nT212_API_KEY=abc123\nT212_API_SECRET=s3cr3t\nOTHER=1\n",
        )
        .unwrap();

        let creds = EnvFileCredentials::new(&path)
            .get_credentials(TRADING212)
            .unwrap();
        assert_eq!(creds.identity(), "abc123");
        assert_eq!(creds.secret(), "s3cr3t");
    }

    #[test]
    fn test_env_file_missing_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "T212_API_KEY=abc123\n").unwrap();

        let result = EnvFileCredentials::new(&path).get_credentials(TRADING212);
        assert!(matches!(result, Err(Error::CredentialsMissing { .. })));
    }

    #[test]
    fn test_env_file_not_found() {
        let result =
            EnvFileCredentials::new("/nonexistent/dir/.env").get_credentials(TRADING212);
        assert!(matches!(result, Err(Error::CredentialsMissing { .. })));
    }

    #[test]
    fn test_unknown_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "T212_API_KEY=a\nT212_API_SECRET=b\n").unwrap();

        let result = EnvFileCredentials::new(&path).get_credentials("Kraken");
        match result {
            Err(Error::CredentialsMissing { provider }) => assert_eq!(provider, "Kraken"),
            other => panic!("expected CredentialsMissing, got {other:?}"),
        }
    }

    #[test]
    fn test_static_credentials() {
        let provider = StaticCredentials::new(Some("id"), Some("secret"));
        assert_eq!(provider.get_credentials(TRADING212).unwrap().identity(), "id");

        let provider = StaticCredentials::new(Some("id"), None);
        assert!(provider.get_credentials(TRADING212).is_err());
    }
}
