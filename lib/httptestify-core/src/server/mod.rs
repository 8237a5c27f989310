//! Test server lifecycle management.
//!
//! A [`ServerLifecycle`] normalizes the three ways of pointing the client at a
//! server into one handle with uniform start/stop semantics:
//!
//! - [`RequestApp::Handler`]: an axum [`Router`](axum::Router) or a handler
//!   function, served by a server created on demand
//! - [`RequestApp::Server`]: an existing [`TestServer`], reused in place
//! - [`RequestApp::Url`]: a base URL of a server managed elsewhere, `start`
//!   and `end` are no-ops
//!
//! # Persistent mode
//!
//! The client starts the server before each call and stops it afterward.
//! [`ServerLifecycle::stay_connected`] starts the server once and suppresses
//! these stops until [`ServerLifecycle::close_connection`] is called.
//!
//! ```rust,no_run
//! use axum::Router;
//! use axum::routing::get;
//! use httptestify_core::RequestConfig;
//! use httptestify_core::server::ServerLifecycle;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = Router::new().route("/health", get(|| async { "ok" }));
//! let lifecycle = ServerLifecycle::new(app, &RequestConfig::default().with_port(8080));
//! assert_eq!(lifecycle.base_url(), Some("http://localhost:8080"));
//!
//! lifecycle.stay_connected().await?;
//! lifecycle.end().await?; // no-op, the server keeps running
//! lifecycle.close_connection().await?; // now the server is closed
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! The lifecycle state is guarded by an async mutex so `start` and `end`
//! never interleave, but the handle has a single-writer contract: the owning
//! test. Running several batches concurrently against one lifecycle without
//! persistent mode lets one batch close the server while another still has
//! calls to issue.

use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tokio::net::TcpSocket;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::RequestConfig;

mod app;
pub use self::app::*;

mod error;
pub use self::error::*;

mod test_server;
pub use self::test_server::{TestServer, tokio_listener};
use self::test_server::{ErasedServer, RouterServer};

const LISTEN_BACKLOG: u32 = 1024;
const MIN_HEALTH_CHECK_DELAY: Duration = Duration::from_millis(10);
const MAX_HEALTH_CHECK_DELAY: Duration = Duration::from_millis(500);

/// A uniform handle starting and stopping a test server.
///
/// See the [module documentation](self) for an overview.
#[derive(Debug)]
pub struct ServerLifecycle {
    kind: LifecycleKind,
    base_url: Option<String>,
    transport: Option<Transport>,
    state: Mutex<LifecycleState>,
}

#[derive(Debug)]
struct Transport {
    server: Arc<dyn ErasedServer>,
    port: u16,
    health_check_attempts: usize,
}

#[derive(Debug, Default)]
struct LifecycleState {
    persistent: bool,
    running: Option<JoinHandle<()>>,
}

impl LifecycleState {
    fn is_listening(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl ServerLifecycle {
    /// Create a lifecycle handle, nothing is started yet.
    ///
    /// Handler and server inputs get the base URL `http://localhost:<port>`
    /// with the configured port, URL inputs keep their literal value.
    pub fn new(app: impl Into<RequestApp>, config: &RequestConfig) -> Self {
        let app = app.into();
        let kind = app.kind();
        let localhost = format!("http://localhost:{}", config.port);

        let (base_url, server) = match app {
            RequestApp::Handler(router) => {
                let server: Arc<dyn ErasedServer> = Arc::new(RouterServer::new(router));
                (Some(localhost), Some(server))
            }
            RequestApp::Server(server) => (Some(localhost), Some(server.into_inner())),
            RequestApp::Url(base_url) => (Some(base_url), None),
            RequestApp::Detached => (None, None),
        };

        let transport = server.map(|server| Transport {
            server,
            port: config.port,
            health_check_attempts: config.health_check_attempts,
        });
        debug!(?kind, ?base_url, "lifecycle created");

        Self {
            kind,
            base_url,
            transport,
            state: Mutex::default(),
        }
    }

    /// The kind of input this lifecycle was built from.
    pub fn kind(&self) -> LifecycleKind {
        self.kind
    }

    /// The resolved base URL, `None` for a detached lifecycle.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// The listening port, only for lifecycles managing a server.
    pub fn port(&self) -> Option<u16> {
        self.transport.as_ref().map(|transport| transport.port)
    }

    /// Whether the managed server is currently listening.
    pub async fn is_listening(&self) -> bool {
        self.state.lock().await.is_listening()
    }

    /// Whether persistent mode is engaged.
    pub async fn is_persistent(&self) -> bool {
        self.state.lock().await.persistent
    }

    /// Start the server if it is not already listening.
    ///
    /// No-op for URL and detached lifecycles.
    ///
    /// # Errors
    ///
    /// Fails if the port cannot be bound or if the server never becomes healthy.
    pub async fn start(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().await;
        self.start_locked(&mut state).await
    }

    /// Close the server if it is listening, unless persistent mode is engaged.
    ///
    /// # Errors
    ///
    /// Fails if the server task panicked.
    pub async fn end(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().await;
        if state.persistent {
            debug!("persistent mode engaged, keep the server running");
            return Ok(());
        }
        Self::close_locked(&mut state).await
    }

    /// Start the server and keep it running across calls.
    ///
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// Same as [`ServerLifecycle::start`].
    pub async fn stay_connected(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().await;
        if state.persistent {
            return Ok(());
        }
        self.start_locked(&mut state).await?;
        state.persistent = true;
        debug!("persistent mode engaged");
        Ok(())
    }

    /// Leave persistent mode and close the server.
    ///
    /// No-op if persistent mode is not engaged.
    ///
    /// # Errors
    ///
    /// Same as [`ServerLifecycle::end`].
    pub async fn close_connection(&self) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().await;
        if !state.persistent {
            return Ok(());
        }
        state.persistent = false;
        debug!("persistent mode disengaged");
        Self::close_locked(&mut state).await
    }

    async fn start_locked(&self, state: &mut LifecycleState) -> Result<(), LifecycleError> {
        let Some(transport) = &self.transport else {
            return Ok(());
        };
        if state.is_listening() {
            return Ok(());
        }

        if let Some(stale) = state.running.take() {
            if let Err(error) = stale.await {
                warn!(?error, "previous server task failed");
            }
        }

        let listener = transport.bind()?;
        let server = Arc::clone(&transport.server);
        state.running = Some(tokio::spawn(server.launch_boxed(listener)));
        info!(port = transport.port, "server listening");

        if let Err(error) = self.wait_for_health(transport).await {
            if let Err(close_error) = Self::close_locked(state).await {
                error!(?close_error, "fail to close the unhealthy server");
            }
            return Err(error);
        }
        Ok(())
    }

    async fn close_locked(state: &mut LifecycleState) -> Result<(), LifecycleError> {
        let Some(handle) = state.running.take() else {
            return Ok(());
        };

        handle.abort();
        match handle.await {
            Ok(()) => debug!("server task already completed"),
            Err(error) if error.is_cancelled() => {}
            Err(error) => {
                error!(?error, "server task failed");
                return Err(LifecycleError::ServerTask(error));
            }
        }
        info!("server closed");
        Ok(())
    }

    async fn wait_for_health(&self, transport: &Transport) -> Result<(), LifecycleError> {
        let base_url = self.base_url.clone().unwrap_or_default();
        let backoff = ExponentialBuilder::default()
            .with_min_delay(MIN_HEALTH_CHECK_DELAY)
            .with_max_delay(MAX_HEALTH_CHECK_DELAY)
            .with_max_times(transport.health_check_attempts.saturating_sub(1));

        let health_check = || {
            let server = Arc::clone(&transport.server);
            let base_url = base_url.clone();
            async move {
                match server.check_health(base_url).await {
                    Some(true) => {
                        debug!("🟢 server healthy");
                        Ok(())
                    }
                    Some(false) => {
                        debug!("🟠 server not yet healthy, retrying with exponential backoff");
                        Err(std::io::Error::new(
                            std::io::ErrorKind::ConnectionRefused,
                            "Server not healthy yet",
                        ))
                    }
                    None => Ok(()),
                }
            }
        };

        health_check.retry(backoff).await.map_err(|error| {
            warn!(?error, "server never became healthy");
            LifecycleError::UnhealthyServer {
                attempts: transport.health_check_attempts.max(1),
            }
        })
    }
}

impl Transport {
    fn bind(&self) -> Result<TcpListener, LifecycleError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.port));
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(LISTEN_BACKLOG)?;
        Ok(listener.into_std()?)
    }
}

/// Abort the server task when the lifecycle is dropped.
impl Drop for ServerLifecycle {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().running.take() {
            handle.abort();
        }
    }
}
