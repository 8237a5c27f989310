use std::fmt::Debug;
use std::future::Future;
use std::net::TcpListener;
use std::pin::Pin;
use std::sync::Arc;

use axum::Router;
use tracing::{debug, error};

/// A trait for servers that can be driven by a [`ServerLifecycle`](super::ServerLifecycle).
///
/// Implement this trait for an existing server to let the lifecycle start it
/// before requests and stop it afterward. The same value is reused in place
/// every time the lifecycle restarts, so `launch` may be called several times.
///
/// # Example
///
/// ```rust
/// use std::net::TcpListener;
///
/// use axum::Router;
/// use axum::routing::get;
/// use httptestify_core::server::{TestServer, tokio_listener};
///
/// #[derive(Debug)]
/// struct HealthServer;
///
/// impl TestServer for HealthServer {
///     async fn launch(&self, listener: TcpListener) {
///         let Ok(listener) = tokio_listener(listener) else {
///             return;
///         };
///         let app = Router::new().route("/health", get(|| async { "ok" }));
///         let _ = axum::serve(listener, app).await;
///     }
///
///     async fn is_healthy(&self, base_url: &str) -> Option<bool> {
///         let url = format!("{base_url}/health");
///         Some(reqwest::get(url).await.is_ok_and(|it| it.status().is_success()))
///     }
/// }
/// ```
pub trait TestServer {
    /// Serve requests on the given listener until the task is aborted.
    ///
    /// The listener is already bound and listening when this is called, so
    /// incoming connections are queued even before the server accepts them.
    fn launch(&self, listener: TcpListener) -> impl Future<Output = ()> + Send;

    /// Check whether the server is ready to handle requests.
    ///
    /// - `Some(true)`: the server is ready
    /// - `Some(false)`: the server is not ready yet, the check is retried with
    ///   exponential backoff
    /// - `None` (default): no health check, a listening socket is enough
    fn is_healthy(&self, _base_url: &str) -> impl Future<Output = Option<bool>> + Send {
        std::future::ready(None)
    }
}

/// Convert a listener handed to [`TestServer::launch`] into a tokio listener.
///
/// # Errors
///
/// Fails if the socket cannot be switched to non-blocking mode or registered
/// with the tokio reactor.
pub fn tokio_listener(listener: TcpListener) -> std::io::Result<tokio::net::TcpListener> {
    listener.set_nonblocking(true)?;
    tokio::net::TcpListener::from_std(listener)
}

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Object-safe view of a [`TestServer`].
pub(crate) trait ErasedServer: Debug + Send + Sync {
    fn launch_boxed(self: Arc<Self>, listener: TcpListener) -> BoxFuture<()>;

    fn check_health(self: Arc<Self>, base_url: String) -> BoxFuture<Option<bool>>;
}

impl<T> ErasedServer for T
where
    T: TestServer + Debug + Send + Sync + 'static,
{
    fn launch_boxed(self: Arc<Self>, listener: TcpListener) -> BoxFuture<()> {
        Box::pin(async move { self.launch(listener).await })
    }

    fn check_health(self: Arc<Self>, base_url: String) -> BoxFuture<Option<bool>> {
        Box::pin(async move { self.is_healthy(&base_url).await })
    }
}

/// Serves an axum [`Router`], used for handler-based lifecycles.
#[derive(Debug, Clone)]
pub(crate) struct RouterServer {
    router: Router,
}

impl RouterServer {
    pub(crate) fn new(router: Router) -> Self {
        Self { router }
    }
}

impl TestServer for RouterServer {
    async fn launch(&self, listener: TcpListener) {
        let listener = match tokio_listener(listener) {
            Ok(listener) => listener,
            Err(error) => {
                error!(?error, "fail to register the listener");
                return;
            }
        };
        debug!(?listener, "serving router");

        if let Err(error) = axum::serve(listener, self.router.clone()).await {
            error!(?error, "router server stopped");
        }
    }
}
