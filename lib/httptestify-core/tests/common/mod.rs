#![allow(dead_code, missing_docs, clippy::expect_used, clippy::missing_panics_doc)]

use std::net::TcpListener;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::info;

use httptestify_core::server::{TestServer, tokio_listener};
use httptestify_core::{RequestClient, RequestConfig, request};

pub const NORMAL_RESPONSE: &str = "This is a normal response";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

/// Body of the fixture `POST`, `PUT` and `PATCH` routes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Delayed {
    pub delay: u64,
    pub status: u16,
}

impl Delayed {
    pub fn new(delay: u64, status: u16) -> Self {
        Self { delay, status }
    }
}

impl Default for Delayed {
    fn default() -> Self {
        Self::new(0, 200)
    }
}

pub fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    info!("Tracing initialized");
}

/// Hands out distinct ports to the tests of one binary, they run concurrently.
#[derive(Debug)]
pub struct Ports(AtomicU16);

impl Ports {
    pub const fn starting_at(port: u16) -> Self {
        Self(AtomicU16::new(port))
    }

    pub fn config(&self) -> RequestConfig {
        RequestConfig::default().with_port(self.0.fetch_add(1, Ordering::Relaxed))
    }

    /// A client around the fixture router, on the next port.
    pub fn fixture_client(&self) -> RequestClient {
        init_tracing();
        match request(fixture_router(), self.config()) {
            Ok(client) => client,
            Err(error) => {
                panic!("fail to create the fixture client: {error:?}");
            }
        }
    }
}

/// The fixture application.
///
/// - `GET /get/{delay}/{status}` answers `status` after `delay` milliseconds
/// - `DELETE /delete/{delay}/{status}` same as above
/// - `POST /post`, `PUT /put` and `PATCH /patch` read the delay and the
///   status from a [`Delayed`] JSON body, `0` and `200` when absent
///
/// Every route answers the JSON [`Message`] `This is a normal response`.
pub fn fixture_router() -> Router {
    Router::new()
        .route("/get/{delay}/{status}", get(delayed_path))
        .route("/delete/{delay}/{status}", delete(delayed_path))
        .route("/post", post(delayed_body))
        .route("/put", put(delayed_body))
        .route("/patch", patch(delayed_body))
}

async fn delayed_path(Path((delay, status)): Path<(u64, u16)>) -> (StatusCode, Json<Message>) {
    answer(Delayed::new(delay, status)).await
}

async fn delayed_body(body: Option<Json<Delayed>>) -> (StatusCode, Json<Message>) {
    let delayed = body.map(|Json(delayed)| delayed).unwrap_or_default();
    answer(delayed).await
}

async fn answer(Delayed { delay, status }: Delayed) -> (StatusCode, Json<Message>) {
    tokio::time::sleep(Duration::from_millis(delay)).await;
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
    let message = Message {
        message: NORMAL_RESPONSE.to_string(),
    };
    (status, Json(message))
}

/// A hand-written server around the fixture router, counting its launches.
#[derive(Debug, Default)]
pub struct FixtureServer {
    launches: AtomicUsize,
}

impl FixtureServer {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl TestServer for FixtureServer {
    async fn launch(&self, listener: TcpListener) {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let listener = tokio_listener(listener).expect("valid listener");
        info!(?listener, "launching fixture server");
        axum::serve(listener, fixture_router())
            .await
            .expect("server launched");
    }

    async fn is_healthy(&self, base_url: &str) -> Option<bool> {
        let url = format!("{base_url}/get/0/200");
        let Ok(client) = reqwest::Client::builder().no_proxy().build() else {
            return Some(false);
        };
        let healthy = client
            .get(url)
            .send()
            .await
            .is_ok_and(|response| response.status().is_success());
        Some(healthy)
    }
}

/// A fixture server managed outside of any lifecycle.
#[derive(Debug)]
pub struct StandaloneServer {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl StandaloneServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind a free port");
        let addr = listener.local_addr().expect("local address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, fixture_router())
                .await
                .expect("server launched");
        });
        info!(%addr, "standalone server listening");

        Self {
            base_url: format!("http://{addr}"),
            handle,
        }
    }
}

impl Drop for StandaloneServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
