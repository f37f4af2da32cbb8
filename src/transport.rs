//! Authenticated request transport
//!
//! Every upstream call goes through a [`Transport`]. The HTTP implementation
//! attaches a Basic authorization header built once from the credentials and
//! classifies each response into a JSON body, a rate limit, a failed request,
//! or a transport fault. It never retries on its own; retry policy belongs to
//! the export poller.

use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::{Error, Result, TransportError};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, RETRY_AFTER};
use serde_json::Value;

/// Longest upstream body kept in a `RequestFailed` error
const MAX_ERROR_BODY: usize = 512;

/// HTTP methods the upstream API is called with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

impl Method {
    /// Upper-case method name
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound call seam used by the export flow
#[async_trait]
pub trait Transport: Send + Sync {
    /// Authenticated call against an API path such as `/equity/account/cash`
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, TransportError>;

    /// Unauthenticated download of an absolute URL
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError>;
}

/// `Authorization` header value for HTTP Basic auth
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// `Basic base64(identity:secret)`
    pub fn basic(credentials: &Credentials) -> Self {
        let raw = format!("{}:{}", credentials.identity(), credentials.secret());
        Self(format!("Basic {}", STANDARD.encode(raw)))
    }

    /// Header value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// [`Transport`] over reqwest
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
    auth: AuthToken,
}

impl HttpTransport {
    /// Create a transport for the configured environment
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &Config, credentials: &Credentials) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("t212-export/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url(),
            auth: AuthToken::basic(credentials),
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> std::result::Result<Value, TransportError> {
        let url = self.endpoint(path);
        tracing::debug!(method = %method, endpoint = %path, "Dispatching upstream request");

        let mut builder = match method {
            Method::Get => self.http_client.get(&url),
            Method::Post => self.http_client.post(&url),
        }
        .header(AUTHORIZATION, self.auth.as_str());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(describe_send_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::fault(format!("failed to read response body: {}", e)))?;

        if status != StatusCode::OK {
            return Err(error_for_status(status, &headers, text));
        }
        serde_json::from_str(&text)
            .map_err(|e| TransportError::fault(format!("response from {} is not JSON: {}", path, e)))
    }

    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError> {
        tracing::debug!(url = %url, "Fetching artifact");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(describe_send_error)?;
        let status = response.status();

        if status != StatusCode::OK {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &headers, text));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::fault(format!("failed to read artifact body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

/// Map a non-200 status to its transport error
fn error_for_status(status: StatusCode, headers: &HeaderMap, body: String) -> TransportError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = headers
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        tracing::warn!(retry_after = ?retry_after, "Upstream rate limit hit");
        return TransportError::RateLimited { retry_after };
    }

    let mut body = body.trim().to_string();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    TransportError::RequestFailed {
        status: status.as_u16(),
        body,
    }
}

fn describe_send_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::timeout(format!("request timed out: {}", e))
    } else if e.is_connect() {
        TransportError::fault(format!("connection failed: {}", e))
    } else {
        TransportError::fault(e)
    }
}

/// Parse a `Retry-After` value given as delta-seconds or an HTTP date
pub fn parse_retry_after(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(secs);
    }
    let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let secs = (at.with_timezone(&chrono::Utc) - chrono::Utc::now()).num_seconds();
    Some(secs.max(0) as u64)
}
