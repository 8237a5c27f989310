use std::time::Duration;

use http::Method;

use crate::RequestConfig;
use crate::server::ServerLifecycle;

mod builder;
pub use self::builder::HttpClientBuilder;

mod call;
pub use self::call::RequestCall;

mod combinators;
pub use self::combinators::Settled;

mod error;
pub use self::error::RequestError;

mod interceptor;
use self::interceptor::Interceptors;

mod request_client;
pub use self::request_client::RequestClient;

mod response;
pub use self::response::CallResponse;

mod status;
pub use self::status::ExpectedStatusCodes;

/// A plain HTTP client bound to an optional base URL.
///
/// Calls are described with the verb methods and sent by awaiting the
/// returned [`RequestCall`]. A response whose status is not expected is a
/// failure carrying that response, see [`RequestError::UnexpectedStatus`].
///
/// This is the client handed to the combinators of [`RequestClient`]: it
/// never starts or stops any server by itself.
///
/// Cloning is cheap, clones share the connection machinery.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Option<String>,
    timeout: Duration,
    expected_status_codes: ExpectedStatusCodes,
    interceptors: Interceptors,
}

impl HttpClient {
    /// Creates a builder.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Creates a client targeting the base URL of the lifecycle.
    ///
    /// A [`Detached`](crate::server::RequestApp::Detached) lifecycle yields a
    /// client without base URL.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be created.
    pub fn for_lifecycle(
        lifecycle: &ServerLifecycle,
        config: &RequestConfig,
    ) -> Result<Self, RequestError> {
        let builder = Self::builder().with_timeout(config.timeout);
        let builder = match lifecycle.base_url() {
            Some(base_url) => builder.with_base_url(base_url),
            None => builder,
        };
        builder.build()
    }

    pub(crate) fn with_interceptors(mut self, interceptors: Interceptors) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// The base URL, if any.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// The default timeout of calls.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Describes a call with any method.
    pub fn call(&self, method: Method, path: impl Into<String>) -> RequestCall {
        RequestCall::build(self.clone(), method, path.into())
    }

    /// Describes a `GET` call.
    pub fn get(&self, path: impl Into<String>) -> RequestCall {
        self.call(Method::GET, path)
    }

    /// Describes a `POST` call.
    pub fn post(&self, path: impl Into<String>) -> RequestCall {
        self.call(Method::POST, path)
    }

    /// Describes a `PUT` call.
    pub fn put(&self, path: impl Into<String>) -> RequestCall {
        self.call(Method::PUT, path)
    }

    /// Describes a `PATCH` call.
    pub fn patch(&self, path: impl Into<String>) -> RequestCall {
        self.call(Method::PATCH, path)
    }

    /// Describes a `DELETE` call.
    pub fn delete(&self, path: impl Into<String>) -> RequestCall {
        self.call(Method::DELETE, path)
    }

    /// Describes a `HEAD` call.
    pub fn head(&self, path: impl Into<String>) -> RequestCall {
        self.call(Method::HEAD, path)
    }

    /// Describes an `OPTIONS` call.
    pub fn options(&self, path: impl Into<String>) -> RequestCall {
        self.call(Method::OPTIONS, path)
    }
}
