use std::sync::Arc;

use super::interceptor::Interceptors;
use super::{HttpClient, RequestError};
use crate::RequestConfig;
use crate::server::{LifecycleError, RequestApp, ServerLifecycle};

/// An HTTP client that owns the lifecycle of the server it calls.
///
/// Every call made through the verb methods (dereferenced from
/// [`HttpClient`]) starts the server, sends the request, then stops the
/// server, unless the lifecycle is persistent (see
/// [`stay_connected`](Self::stay_connected)).
///
/// Any status is resolved: a response outside the expected status codes
/// is returned as a regular response. Only failures without response
/// (timeouts, connection errors, lifecycle errors...) are errors.
///
/// ```rust,no_run
/// use axum::Json;
/// use httptestify_core::{RequestClient, RequestConfig};
///
/// # async fn example() -> Result<(), httptestify_core::RequestError> {
/// let app = axum::Router::new().route(
///     "/hello",
///     axum::routing::get(|| async { Json(serde_json::json!({ "message": "hi" })) }),
/// );
/// let client = RequestClient::new(app, RequestConfig::default())?;
///
/// let response = client.get("/hello").await?;
/// assert_eq!(response.status_code(), 200);
/// assert!(!client.lifecycle().is_listening().await);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, derive_more::Deref)]
pub struct RequestClient {
    #[deref]
    client: HttpClient,
    lifecycle: Arc<ServerLifecycle>,
    config: RequestConfig,
}

impl RequestClient {
    /// Creates a client for the application.
    ///
    /// Nothing is started until the first call.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be created.
    pub fn new(app: impl Into<RequestApp>, config: RequestConfig) -> Result<Self, RequestError> {
        let lifecycle = Arc::new(ServerLifecycle::new(app, &config));
        Self::with_lifecycle(lifecycle, config)
    }

    /// Creates a client sharing an existing lifecycle.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be created.
    pub fn with_lifecycle(
        lifecycle: Arc<ServerLifecycle>,
        config: RequestConfig,
    ) -> Result<Self, RequestError> {
        let client = HttpClient::for_lifecycle(&lifecycle, &config)?
            .with_interceptors(Interceptors::implicit(Arc::clone(&lifecycle)));

        Ok(Self {
            client,
            lifecycle,
            config,
        })
    }

    /// The lifecycle driven by this client.
    pub fn lifecycle(&self) -> &Arc<ServerLifecycle> {
        &self.lifecycle
    }

    /// The configuration this client was created with.
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Starts the server and keeps it running across calls.
    ///
    /// # Errors
    ///
    /// Fails if the server cannot be started.
    pub async fn stay_connected(&self) -> Result<(), LifecycleError> {
        self.lifecycle.stay_connected().await
    }

    /// Leaves persistent mode and stops the server.
    ///
    /// # Errors
    ///
    /// Fails if the server task failed.
    pub async fn close_connection(&self) -> Result<(), LifecycleError> {
        self.lifecycle.close_connection().await
    }

    /// A fresh client for the calls of a combinator, without lifecycle hooks.
    pub(super) fn batch_client(&self) -> Result<HttpClient, RequestError> {
        HttpClient::for_lifecycle(&self.lifecycle, &self.config)
    }
}
