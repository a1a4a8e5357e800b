//! Conversions from external infrastructure errors into domain errors.

use clout_domain::{CloutError, FetchFailure};
use object_store::Error as StoreError;
use reqwest::{Error as HttpError, StatusCode};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CloutError);

impl From<InfraError> for CloutError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CloutError> for InfraError {
    fn from(value: CloutError) -> Self {
        InfraError(value)
    }
}

trait IntoCloutError {
    fn into_clout(self) -> CloutError;
}

/* -------------------------------------------------------------------------- */
/* object_store::Error → CloutError */
/* -------------------------------------------------------------------------- */

impl IntoCloutError for StoreError {
    fn into_clout(self) -> CloutError {
        match self {
            StoreError::NotFound { path, .. } => CloutError::NotFound(format!("object {path}")),
            StoreError::InvalidPath { source } => {
                CloutError::InvalidInput(format!("invalid object path: {source}"))
            }
            StoreError::NotSupported { source } => {
                CloutError::Storage(format!("operation not supported: {source}"))
            }
            StoreError::NotImplemented => {
                CloutError::Storage("operation not implemented by backend".into())
            }
            other => CloutError::Storage(other.to_string()),
        }
    }
}

impl From<StoreError> for InfraError {
    fn from(value: StoreError) -> Self {
        InfraError(value.into_clout())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CloutError */
/* -------------------------------------------------------------------------- */

impl IntoCloutError for HttpError {
    fn into_clout(self) -> CloutError {
        if self.is_timeout() {
            return CloutError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return CloutError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return CloutError::Serialization(format!("failed to decode HTTP body: {self}"));
        }

        if let Some(status) = self.status() {
            let message = status_message(status);
            return match status.as_u16() {
                401 | 403 => CloutError::Auth(message),
                404 => CloutError::NotFound(message),
                429 => CloutError::RateLimited(message),
                400..=499 => CloutError::InvalidInput(message),
                _ => CloutError::Network(message),
            };
        }

        CloutError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_clout())
    }
}

/* -------------------------------------------------------------------------- */
/* Provider fetch failures */
/* -------------------------------------------------------------------------- */

/// Classify a non-success provider response.
pub fn fetch_failure_for_status(provider: &str, status: StatusCode) -> FetchFailure {
    let message = format!("{provider}: {}", status_message(status));
    match status.as_u16() {
        401 | 403 => FetchFailure::auth(message),
        429 => FetchFailure::rate_limited(message),
        _ => FetchFailure::transport(message),
    }
}

fn status_message(status: StatusCode) -> String {
    format!("HTTP {} {}", status.as_u16(), status.canonical_reason().unwrap_or("unknown status"))
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
