use std::fmt::Debug;
use std::sync::Arc;

use axum::Router;
use axum::handler::Handler;

use super::test_server::{ErasedServer, TestServer};

/// What a [`ServerLifecycle`](super::ServerLifecycle) is built from.
///
/// Most of the time you do not build this enum yourself, the `From`
/// conversions cover the usual inputs:
///
/// ```rust
/// use axum::Router;
/// use httptestify_core::server::{LifecycleKind, RequestApp};
///
/// assert_eq!(RequestApp::from(Router::new()).kind(), LifecycleKind::Handler);
/// assert_eq!(RequestApp::from("http://localhost:4000").kind(), LifecycleKind::Url);
/// assert_eq!(RequestApp::from(None::<&str>).kind(), LifecycleKind::Detached);
/// ```
#[derive(Debug, Clone, Default)]
pub enum RequestApp {
    /// A request handler, served by a new server created by the lifecycle.
    Handler(Router),

    /// An existing server, reused in place by the lifecycle.
    Server(SharedServer),

    /// A literal base URL of a server managed elsewhere.
    Url(String),

    /// No input.
    ///
    /// The lifecycle has no base URL and its start and end are no-ops. Calls
    /// made through it fail with
    /// [`RequestError::MissingBaseUrl`](crate::RequestError::MissingBaseUrl).
    #[default]
    Detached,
}

/// Kind of a [`RequestApp`], kept by the lifecycle for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    /// Built from a request handler.
    Handler,
    /// Built from an existing server.
    Server,
    /// Built from a base URL.
    Url,
    /// Built from nothing.
    Detached,
}

impl RequestApp {
    /// Wrap a handler function, every request is routed to it.
    ///
    /// ```rust
    /// use axum::http::StatusCode;
    /// use httptestify_core::server::RequestApp;
    ///
    /// let app = RequestApp::handler(|| async { (StatusCode::ACCEPTED, "queued") });
    /// ```
    pub fn handler<H, T>(handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::Handler(Router::new().fallback(handler))
    }

    /// Wrap an existing server.
    pub fn server<S>(server: S) -> Self
    where
        S: TestServer + Debug + Send + Sync + 'static,
    {
        Self::Server(SharedServer::new(server))
    }

    /// Use a literal base URL.
    pub fn url(base_url: impl Into<String>) -> Self {
        Self::Url(base_url.into())
    }

    /// The kind of input.
    pub fn kind(&self) -> LifecycleKind {
        match self {
            Self::Handler(_) => LifecycleKind::Handler,
            Self::Server(_) => LifecycleKind::Server,
            Self::Url(_) => LifecycleKind::Url,
            Self::Detached => LifecycleKind::Detached,
        }
    }
}

impl From<Router> for RequestApp {
    fn from(router: Router) -> Self {
        Self::Handler(router)
    }
}

impl From<SharedServer> for RequestApp {
    fn from(server: SharedServer) -> Self {
        Self::Server(server)
    }
}

impl From<&str> for RequestApp {
    fn from(base_url: &str) -> Self {
        Self::url(base_url)
    }
}

impl From<String> for RequestApp {
    fn from(base_url: String) -> Self {
        Self::Url(base_url)
    }
}

impl From<url::Url> for RequestApp {
    fn from(base_url: url::Url) -> Self {
        Self::Url(base_url.into())
    }
}

impl<T> From<Option<T>> for RequestApp
where
    T: Into<RequestApp>,
{
    fn from(app: Option<T>) -> Self {
        app.map_or(Self::Detached, Into::into)
    }
}

/// A shareable handle on an existing [`TestServer`].
///
/// Use [`SharedServer::from_arc`] to keep your own reference to the server,
/// for example to inspect its state after the calls.
#[derive(Debug, Clone)]
pub struct SharedServer(Arc<dyn ErasedServer>);

impl SharedServer {
    /// Share a server.
    pub fn new<S>(server: S) -> Self
    where
        S: TestServer + Debug + Send + Sync + 'static,
    {
        Self(Arc::new(server))
    }

    /// Share a server you keep a reference to.
    pub fn from_arc<S>(server: Arc<S>) -> Self
    where
        S: TestServer + Debug + Send + Sync + 'static,
    {
        Self(server)
    }

    pub(crate) fn into_inner(self) -> Arc<dyn ErasedServer> {
        self.0
    }
}
