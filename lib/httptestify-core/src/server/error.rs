//! Error types for the server lifecycle.

/// Errors raised while starting or stopping a test server.
///
/// Bind and close failures are reported as they happen, nothing is retried.
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use httptestify_core::server::{LifecycleError, ServerLifecycle};
/// use httptestify_core::RequestConfig;
///
/// # async fn example() {
/// let lifecycle = ServerLifecycle::new(Router::new(), &RequestConfig::default());
/// match lifecycle.start().await {
///     Ok(()) => println!("listening on {:?}", lifecycle.base_url()),
///     Err(LifecycleError::IoError(error)) => println!("port unavailable: {error}"),
///     Err(error) => println!("other failure: {error}"),
/// }
/// # }
/// ```
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum LifecycleError {
    /// I/O operation failed.
    ///
    /// Typically the configured port is already in use.
    IoError(std::io::Error),

    /// The server task panicked, reported when the server is closed.
    #[display("Server task failed: {_0}")]
    ServerTask(tokio::task::JoinError),

    /// The server never reported itself healthy.
    #[display("Server still unhealthy after {attempts} health check(s)")]
    #[from(skip)]
    UnhealthyServer {
        /// Number of health checks performed.
        attempts: usize,
    },
}
