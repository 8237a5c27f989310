use std::time::Duration;

use super::CallResponse;
use crate::server::LifecycleError;

/// Errors that can occur when issuing calls.
///
/// The important distinction is whether the failure carries a response:
/// only [`RequestError::UnexpectedStatus`] does, every other variant means the
/// server never answered (or the call was never sent).
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum RequestError {
    /// HTTP client error from the underlying reqwest library.
    ///
    /// Connection refused, DNS failure, broken connection...
    ReqwestError(reqwest::Error),

    /// URL parsing error when joining the base URL and the path.
    UrlError(url::ParseError),

    /// Invalid HTTP header name.
    InvalidHeaderName(http::header::InvalidHeaderName),

    /// Invalid HTTP header value.
    InvalidHeaderValue(http::header::InvalidHeaderValue),

    /// Request body serialization error.
    JsonValueError(serde_json::Error),

    /// Response body is not UTF-8.
    Utf8Error(std::str::Utf8Error),

    /// The server could not be started or stopped.
    LifecycleError(LifecycleError),

    /// A call spawned by a combinator was cancelled.
    JoinError(tokio::task::JoinError),

    /// The call did not complete within its timeout.
    #[display("timeout of {}ms exceeded", timeout.as_millis())]
    #[from(skip)]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The client has no base URL, see [`RequestApp::Detached`](crate::server::RequestApp::Detached).
    #[display("No base URL configured, cannot call '{path}'")]
    #[from(skip)]
    MissingBaseUrl {
        /// The requested path.
        path: String,
    },

    /// The server answered with a status that is not expected.
    #[display("Unexpected status code {}: {}", response.status_code(), String::from_utf8_lossy(response.as_bytes()))]
    #[from(skip)]
    UnexpectedStatus {
        /// The response received.
        response: Box<CallResponse>,
    },

    /// JSON response deserialization failure.
    #[display("Failed to deserialize JSON at '{path}': {error}\n{body}")]
    #[from(skip)]
    JsonError {
        /// The JSON path where the error occurred.
        path: String,
        /// The underlying JSON parsing error.
        error: serde_json::Error,
        /// The response body that failed to parse.
        body: String,
    },

    /// `race` was given no call, it would never settle.
    #[display("Cannot race an empty list of calls")]
    #[from(skip)]
    EmptyRace,
}

impl RequestError {
    /// The response carried by the failure, if the server answered.
    pub fn response(&self) -> Option<&CallResponse> {
        match self {
            Self::UnexpectedStatus { response } => Some(response.as_ref()),
            _ => None,
        }
    }

    /// Take the response carried by the failure, or give the error back.
    ///
    /// # Errors
    ///
    /// Returns `self` when the failure carries no response.
    pub fn into_response(self) -> Result<CallResponse, Self> {
        match self {
            Self::UnexpectedStatus { response } => Ok(*response),
            other => Err(other),
        }
    }

    /// Whether the call exceeded its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
