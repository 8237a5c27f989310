use std::time::Duration;

use super::interceptor::Interceptors;
use super::{ExpectedStatusCodes, HttpClient, RequestError};
use crate::config::DEFAULT_TIMEOUT;

/// Builder for [`HttpClient`] instances.
///
/// # Default Configuration
///
/// - **Base URL**: none, calls fail with [`RequestError::MissingBaseUrl`]
/// - **Timeout**: [`DEFAULT_TIMEOUT`](crate::DEFAULT_TIMEOUT)
/// - **Expected status codes**: the `2xx` class
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use httptestify_core::HttpClient;
///
/// # fn example() -> Result<(), httptestify_core::RequestError> {
/// let client = HttpClient::builder()
///     .with_base_url("http://localhost:8080")
///     .with_timeout(Duration::from_secs(2))
///     .build()?;
/// assert_eq!(client.base_url(), Some("http://localhost:8080"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    expected_status_codes: ExpectedStatusCodes,
}

impl HttpClientBuilder {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be created. The base URL
    /// is only resolved when a call is awaited.
    pub fn build(self) -> Result<HttpClient, RequestError> {
        let Self {
            base_url,
            timeout,
            expected_status_codes,
        } = self;

        // Servers restart between calls, idle connections would outlive them
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()?;

        Ok(HttpClient {
            client,
            base_url,
            timeout,
            expected_status_codes,
            interceptors: Interceptors::default(),
        })
    }

    /// Sets the base URL every call path is resolved against.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the default timeout of calls.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the default expected status codes of calls.
    #[must_use]
    pub fn with_expected_status_codes(mut self, expected: impl Into<ExpectedStatusCodes>) -> Self {
        self.expected_status_codes = expected.into();
        self
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            expected_status_codes: ExpectedStatusCodes::default(),
        }
    }
}
