//! Configuration shared by the server lifecycle and the HTTP client.

use std::time::Duration;

/// Default port used when a handler or a server is wrapped without an explicit port.
pub const DEFAULT_PORT: u16 = 65025;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of health check attempts performed after the server starts listening.
///
/// Only used when the server provides a health check, see
/// [`TestServer::is_healthy`](crate::server::TestServer::is_healthy).
pub const DEFAULT_HEALTH_CHECK_ATTEMPTS: usize = 10;

/// Configuration for a [`RequestClient`](crate::RequestClient).
///
/// Every field has a default, so partial configurations read naturally:
///
/// ```rust
/// use std::time::Duration;
/// use httptestify_core::RequestConfig;
///
/// let config = RequestConfig {
///     port: 2022,
///     ..Default::default()
/// };
/// assert_eq!(config.timeout, Duration::from_secs(30));
///
/// let config = RequestConfig::default().with_timeout(Duration::from_millis(500));
/// assert_eq!(config.port, 65025);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    /// The port the wrapped handler or server listens on.
    ///
    /// Ignored for URL-based clients.
    pub port: u16,

    /// The default timeout of each request, can be overridden per call.
    pub timeout: Duration,

    /// Maximum number of health checks before giving up on a freshly started server.
    pub health_check_attempts: usize,
}

impl RequestConfig {
    /// Set the listening port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the default request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of health check attempts.
    pub fn with_health_check_attempts(mut self, attempts: usize) -> Self {
        self.health_check_attempts = attempts;
        self
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            health_check_attempts: DEFAULT_HEALTH_CHECK_ATTEMPTS,
        }
    }
}
