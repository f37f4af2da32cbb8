//! HTTP error response handling for the API
//!
//! This module provides conversions from domain errors to HTTP responses
//! with appropriate status codes and JSON error bodies.

use crate::error::{ApiError, Error, ExportError, ToHttpStatus, TransportError};
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};

/// Retry-After sent when upstream gave no hint
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let retry_after = match &self {
            Error::Transport(TransportError::RateLimited { retry_after }) => {
                Some(retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS))
            }
            Error::Export(ExportError::RateLimited { .. }) => Some(DEFAULT_RETRY_AFTER_SECS),
            _ => None,
        };

        if status_code.is_server_error() {
            tracing::error!(error = %self, status = status_code.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status_code.as_u16(), "Request rejected");
        }

        let api_error: ApiError = self.into();
        let mut response = (status_code, Json(api_error)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
